//! Module: reduce::compiler
//! Responsibility: resolve requested function names into a deduplicated,
//! validated pre / agg / post step plan.
//! Does not own: execution of any step.
//! Boundary: the only place function names are interpreted.

use crate::{
    error::InternalError,
    reduce::{
        AggKwargs, AggStep, CustomHandle, CustomRegistry, PostFunc, PostStep, PreStep,
        PreTransform, ReductionSteps, Statistic, StepFunc, StepKey,
    },
};
use std::collections::BTreeSet;

///
/// RequestedFunc
///
/// One user-visible output: `func` applied to `columns`, labelled
/// `display_name`. Repeats are legal and stay independent outputs.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestedFunc {
    pub func: String,
    pub display_name: String,
    pub columns: Vec<String>,
    pub kwargs: AggKwargs,
}

impl RequestedFunc {
    #[must_use]
    pub fn new(func: impl Into<String>, columns: Vec<String>) -> Self {
        let func = func.into();

        Self {
            display_name: func.clone(),
            func,
            columns,
            kwargs: AggKwargs::default(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub const fn with_kwargs(mut self, kwargs: AggKwargs) -> Self {
        self.kwargs = kwargs;
        self
    }
}

///
/// ReductionCompiler
///
/// Compiles requested functions into steps whose map/agg halves are
/// associative across chunk boundaries.
///

pub trait ReductionCompiler: Send + Sync {
    fn compile(&self, funcs: &[RequestedFunc], ndim: usize)
    -> Result<ReductionSteps, InternalError>;
}

///
/// Recipe
///
/// Decomposition of one function name: builtin partial statistics over
/// (optionally transformed) inputs plus a finalizer, or a custom handler.
///

enum Recipe {
    Builtin {
        parts: Vec<(PreTransform, Statistic)>,
        finalize: PostFunc,
    },
    Custom(CustomHandle),
}

///
/// DefaultReductionCompiler
///

#[derive(Clone, Debug)]
pub struct DefaultReductionCompiler {
    registry: CustomRegistry,
}

impl Default for DefaultReductionCompiler {
    fn default() -> Self {
        Self::new(CustomRegistry::with_builtins())
    }
}

impl DefaultReductionCompiler {
    #[must_use]
    pub const fn new(registry: CustomRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub const fn registry(&self) -> &CustomRegistry {
        &self.registry
    }

    fn resolve(&self, name: &str) -> Result<Recipe, InternalError> {
        use PreTransform::{Power, Select};
        use Statistic::{Count, Sum};

        let moments = |order: u8| {
            let mut parts = vec![(Select, Sum)];
            parts.extend((2..=order).map(|exp| (Power(exp), Sum)));
            parts.push((Select, Count));
            parts
        };

        let recipe = match name {
            "mean" => Recipe::Builtin {
                parts: moments(1),
                finalize: PostFunc::Mean,
            },
            "var" => Recipe::Builtin {
                parts: moments(2),
                finalize: PostFunc::Var { ddof: 1 },
            },
            "std" => Recipe::Builtin {
                parts: moments(2),
                finalize: PostFunc::Std { ddof: 1 },
            },
            "sem" => Recipe::Builtin {
                parts: moments(2),
                finalize: PostFunc::Sem { ddof: 1 },
            },
            "skew" => Recipe::Builtin {
                parts: moments(3),
                finalize: PostFunc::Skew,
            },
            "kurt" | "kurtosis" => Recipe::Builtin {
                parts: moments(4),
                finalize: PostFunc::Kurt,
            },
            other => {
                if let Some(stat) = Statistic::from_name(other) {
                    Recipe::Builtin {
                        parts: vec![(Select, stat)],
                        finalize: PostFunc::Identity,
                    }
                } else if let Some(handle) = self.registry.get(other) {
                    Recipe::Custom(handle)
                } else {
                    return Err(InternalError::reduction_unsupported(format!(
                        "unsupported aggregation function '{other}'",
                    )));
                }
            }
        };

        Ok(recipe)
    }
}

impl ReductionCompiler for DefaultReductionCompiler {
    fn compile(
        &self,
        funcs: &[RequestedFunc],
        ndim: usize,
    ) -> Result<ReductionSteps, InternalError> {
        if !(1..=2).contains(&ndim) {
            return Err(InternalError::reduction_unsupported(format!(
                "cannot aggregate {ndim}-dimensional input",
            )));
        }
        if funcs.is_empty() {
            return Err(InternalError::reduction_unsupported(
                "no aggregation functions requested",
            ));
        }

        let mut builder = StepsBuilder::default();
        for (ordinal, request) in funcs.iter().enumerate() {
            if ndim == 1 && request.columns.len() > 1 {
                return Err(InternalError::reduction_unsupported(format!(
                    "'{}' selects {} columns of one-dimensional input",
                    request.func,
                    request.columns.len(),
                )));
            }

            let select = builder.pre(&request.columns, PreTransform::Select);
            let (input_keys, finalize) = match self.resolve(&request.func)? {
                Recipe::Builtin { parts, finalize } => {
                    let mut keys = Vec::with_capacity(parts.len());
                    for (transform, stat) in parts {
                        let input = match transform {
                            PreTransform::Select => select.clone(),
                            PreTransform::Power(_) => builder.pre(&request.columns, transform),
                        };
                        keys.push(builder.builtin(&request.func, input, stat, request.kwargs));
                    }
                    (keys, finalize)
                }
                Recipe::Custom(handle) => {
                    let key = builder.custom(&request.func, select, handle, request.kwargs);
                    (vec![key], PostFunc::Identity)
                }
            };

            builder.post.push(PostStep {
                input_keys,
                output_key: StepKey::new(format!("{ordinal}:{}", request.display_name)),
                display_name: request.display_name.clone(),
                columns: request.columns.clone(),
                finalize,
            });
        }

        ReductionSteps::new(builder.pre, builder.agg, builder.post)
    }
}

///
/// StepsBuilder
///
/// Accumulates steps, deduplicating pre and agg steps by key. Post steps
/// are appended as-is.
///

#[derive(Default)]
struct StepsBuilder {
    pre: Vec<PreStep>,
    agg: Vec<AggStep>,
    post: Vec<PostStep>,
    seen: BTreeSet<StepKey>,
}

impl StepsBuilder {
    fn pre(&mut self, columns: &[String], transform: PreTransform) -> StepKey {
        let select_key = StepKey::new(format!("select[{}]", columns.join(",")));
        if !matches!(transform, PreTransform::Select) {
            // Transforms read the plain selection of the same columns.
            self.pre(columns, PreTransform::Select);
        }
        let key = match transform {
            PreTransform::Select => select_key.clone(),
            other => StepKey::new(format!("{other}[{}]", columns.join(","))),
        };

        if self.seen.insert(key.clone()) {
            self.pre.push(PreStep {
                input_key: if matches!(transform, PreTransform::Select) {
                    key.clone()
                } else {
                    select_key
                },
                output_key: key.clone(),
                columns: columns.to_vec(),
                transform,
            });
        }

        key
    }

    fn builtin(
        &mut self,
        raw_name: &str,
        input: StepKey,
        stat: Statistic,
        kwargs: AggKwargs,
    ) -> StepKey {
        let merge = stat.merge_statistic();
        let key = StepKey::new(format!(
            "{stat}>{merge}({input}){}",
            skipna_suffix(kwargs),
        ));
        self.push_agg(AggStep {
            input_key: input,
            raw_name: raw_name.to_string(),
            map: StepFunc::Builtin(stat),
            agg: StepFunc::Builtin(merge),
            output_key: key.clone(),
            output_count: 1,
            kwargs,
        });

        key
    }

    fn custom(
        &mut self,
        raw_name: &str,
        input: StepKey,
        handle: CustomHandle,
        kwargs: AggKwargs,
    ) -> StepKey {
        let key = StepKey::new(format!(
            "{}({input}){}",
            handle.name(),
            skipna_suffix(kwargs),
        ));
        self.push_agg(AggStep {
            input_key: input,
            raw_name: raw_name.to_string(),
            output_count: handle.handler().output_count(),
            map: StepFunc::Custom(handle.clone()),
            agg: StepFunc::Custom(handle),
            output_key: key.clone(),
            kwargs,
        });

        key
    }

    fn push_agg(&mut self, step: AggStep) {
        if self.seen.insert(step.output_key.clone()) {
            self.agg.push(step);
        }
    }
}

fn skipna_suffix(kwargs: AggKwargs) -> &'static str {
    if kwargs.skipna { "" } else { "!skipna" }
}
