use crate::{frame::Frame, value::Value};

// Text and list cells carry their dtype's fixed header plus the payload.
fn value_bytes(value: &Value) -> u64 {
    let header = value.dtype().cell_bytes();
    match value {
        Value::Null => 1,
        Value::Text(text) => header + text.len() as u64,
        Value::List(items) => header + items.iter().map(value_bytes).sum::<u64>(),
        _ => header,
    }
}

impl Frame {
    /// Approximate in-memory footprint of index and column cells.
    #[must_use]
    pub fn estimated_size(&self) -> u64 {
        let index: u64 = self
            .index()
            .keys()
            .iter()
            .flat_map(|key| key.iter())
            .map(value_bytes)
            .sum();
        let data: u64 = self
            .columns()
            .iter()
            .flat_map(|column| column.values())
            .map(value_bytes)
            .sum();

        index + data
    }
}
