use crate::{
    frame::{Column, Frame, FrameError, Index},
    value::{DType, KeyTuple, Value},
};
use std::collections::HashMap;

impl Column {
    /// Concatenate columns end to end. Parts that agree on dtype keep it;
    /// empty parts do not vote; any remaining disagreement re-infers.
    #[must_use]
    pub fn concat(parts: &[&Self]) -> Self {
        let values: Vec<Value> = parts
            .iter()
            .flat_map(|part| part.values().iter().cloned())
            .collect();

        let mut voting = parts.iter().filter(|part| !part.is_empty()).map(|p| p.dtype());
        let dtype = match voting.next() {
            None => parts.first().map_or(DType::Object, |part| part.dtype()),
            Some(first) if voting.all(|dtype| dtype == first) => first,
            Some(_) => DType::infer(&values),
        };

        Self::typed(dtype, values)
    }
}

fn merge_dtypes(parts: &[&[DType]], empty: &[bool]) -> Vec<DType> {
    let Some(first) = parts.first() else {
        return Vec::new();
    };

    (0..first.len())
        .map(|level| {
            let mut voting = parts
                .iter()
                .zip(empty)
                .filter(|(_, empty)| !**empty)
                .map(|(dtypes, _)| dtypes[level]);
            match voting.next() {
                None => first[level],
                Some(dtype) if voting.all(|other| other == dtype) => dtype,
                Some(DType::Int64 | DType::Float64) => DType::Float64,
                Some(_) => DType::Object,
            }
        })
        .collect()
}

impl Frame {
    /// Stack frames vertically. Every frame must carry the same column labels
    /// in the same order and the same number of index levels.
    pub fn concat_rows(frames: &[Self]) -> Result<Self, FrameError> {
        let Some(first) = frames.first() else {
            return Err(FrameError::LengthMismatch {
                expected: 1,
                found: 0,
            });
        };
        if frames.len() == 1 {
            return Ok(first.clone());
        }

        for frame in &frames[1..] {
            if frame.index.nlevels() != first.index.nlevels() {
                return Err(FrameError::LevelMismatch {
                    expected: first.index.nlevels(),
                    found: frame.index.nlevels(),
                });
            }
            if frame.labels != first.labels {
                let missing = first
                    .labels
                    .iter()
                    .find(|label| !frame.labels.contains(label))
                    .or_else(|| frame.labels.first())
                    .map(ToString::to_string)
                    .unwrap_or_default();
                return Err(FrameError::ColumnNotFound { label: missing });
            }
        }

        let keys: Vec<KeyTuple> = frames
            .iter()
            .flat_map(|frame| frame.index.keys().iter().cloned())
            .collect();
        let index_dtypes: Vec<&[DType]> = frames.iter().map(|f| f.index.dtypes()).collect();
        let empty: Vec<bool> = frames.iter().map(|f| f.nrows() == 0).collect();
        let index = Index::new(
            first.index.names().to_vec(),
            merge_dtypes(&index_dtypes, &empty),
            keys,
        )?;

        let columns = (0..first.ncols())
            .map(|pos| {
                let parts: Vec<&Column> = frames.iter().map(|frame| &frame.columns[pos]).collect();
                Column::concat(&parts)
            })
            .collect();

        Self::new(index, first.labels.clone(), columns)
    }

    /// Place frames side by side, aligning rows on index keys. Keys keep
    /// their first-appearance order; cells a frame lacks are null.
    pub fn concat_columns(frames: &[Self]) -> Result<Self, FrameError> {
        let Some(first) = frames.first() else {
            return Err(FrameError::LengthMismatch {
                expected: 1,
                found: 0,
            });
        };

        if let Some(frame) = frames
            .iter()
            .find(|frame| frame.index.nlevels() != first.index.nlevels())
        {
            return Err(FrameError::LevelMismatch {
                expected: first.index.nlevels(),
                found: frame.index.nlevels(),
            });
        }

        let aligned = frames
            .iter()
            .all(|frame| frame.index.keys() == first.index.keys());
        if aligned {
            let mut labels = Vec::new();
            let mut columns = Vec::new();
            for frame in frames {
                labels.extend(frame.labels.iter().cloned());
                columns.extend(frame.columns.iter().cloned());
            }

            return Self::new(first.index.clone(), labels, columns);
        }

        // Phase 1: union of keys in first-appearance order.
        let mut order: Vec<KeyTuple> = Vec::new();
        let mut slots: HashMap<KeyTuple, usize> = HashMap::new();
        for frame in frames {
            for key in frame.index.keys() {
                if !slots.contains_key(key) {
                    slots.insert(key.clone(), order.len());
                    order.push(key.clone());
                }
            }
        }

        // Phase 2: scatter every column into the union layout.
        let mut labels = Vec::new();
        let mut columns = Vec::new();
        for frame in frames {
            let rows: Vec<usize> = frame.index.keys().iter().map(|key| slots[key]).collect();
            for (label, column) in frame.labels.iter().zip(&frame.columns) {
                let mut values = vec![Value::Null; order.len()];
                for (value, slot) in column.values().iter().zip(&rows) {
                    values[*slot] = value.clone();
                }
                labels.push(label.clone());
                columns.push(Column::typed(column.dtype(), values));
            }
        }

        let index = Index::new(
            first.index.names().to_vec(),
            first.index.dtypes().to_vec(),
            order,
        )?;

        Self::new(index, labels, columns)
    }
}
