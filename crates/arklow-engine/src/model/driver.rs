//! Parallel lowering driver
//!
//! Lowers every method of a file. Jobs run in rounds: the first round holds
//! the methods declared in the source, each later round the nested
//! functions and classes reported by the previous one. Within a round jobs
//! are spread over scoped worker threads and merged back in job order, so
//! the model does not depend on scheduling.

use super::sink::CollectingSink;
use super::{FileModel, JobSource, LowerJob, ModelBuilder};
use crate::builtins::Builtins;
use crate::config::{ArklowConfig, LowerConfig};
use crate::error::{LoadError, LowerError};
use crate::ir::{FileSignature, MethodBody};
use crate::lower::{BodyInput, Lowerer};
use crate::parser::ast::Module;
use crate::parser::{Interner, ParseError, Parser, SourceFile};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info_span, trace, warn};

/// Read-only state shared by every job of a file.
struct Shared<'e> {
    source: &'e SourceFile,
    interner: &'e Interner,
    builtins: &'e Builtins,
    config: &'e LowerConfig,
}

/// Worker stack size. Lowering recurses once per nesting level, up to
/// [`MAX_LOWER_DEPTH`](crate::lower::MAX_LOWER_DEPTH) levels, which outgrows
/// the default 2 MiB thread stack.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

struct JobResult<'e> {
    body: Result<MethodBody, LowerError>,
    sink: CollectingSink<'e>,
}

/// Read, parse and lower a file.
pub fn lower_file(path: &Path, config: &ArklowConfig) -> Result<FileModel, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = SourceFile::new(path.display().to_string(), text);
    lower_source(&source, config)
}

/// Parse and lower an in-memory source file.
pub fn lower_source(source: &SourceFile, config: &ArklowConfig) -> Result<FileModel, LoadError> {
    let parsed = Parser::new(source.text())
        .map_err(|errors| errors.into_iter().map(ParseError::from).collect::<Vec<_>>())
        .and_then(|parser| parser.parse());
    let (module, interner) = parsed.map_err(|errors| LoadError::Parse {
        file: source.name().to_string(),
        errors,
    })?;
    Ok(lower_module(&module, &interner, source, config))
}

/// Lower a parsed module.
pub fn lower_module(
    module: &Module,
    interner: &Interner,
    source: &SourceFile,
    config: &ArklowConfig,
) -> FileModel {
    let _span = info_span!("file", name = source.name()).entered();
    let builtins = Builtins::from_config(&config.lower);
    let file = FileSignature::new(config.project.name.clone(), source.name());
    let (mut builder, mut jobs) = ModelBuilder::new(file, module, interner, &builtins);

    let shared = Shared {
        source,
        interner,
        builtins: &builtins,
        config: &config.lower,
    };
    let workers = config.lower.worker_count();

    let mut round = 0usize;
    while !jobs.is_empty() {
        let _round = info_span!("round", round, jobs = jobs.len()).entered();
        let results = run_round(&jobs, &shared, workers);

        let mut next = Vec::new();
        for (job, result) in jobs.iter().zip(results) {
            match result.body {
                Ok(body) => builder.complete(job.slot, body),
                Err(error) => {
                    warn!(method = %job.context.signature, %error, "method left without a body");
                    builder.fail(job, error);
                }
            }
            let sink = result.sink;
            next.extend(builder.absorb(sink.functions, sink.classes, sink.objects));
        }
        debug!(nested = next.len(), "round finished");
        jobs = next;
        round += 1;
    }
    builder.finish()
}

fn run_round<'e>(jobs: &[LowerJob], shared: &Shared<'e>, workers: usize) -> Vec<JobResult<'e>> {
    let workers = workers.min(jobs.len());
    if workers <= 1 {
        return jobs.iter().map(|job| lower_job(job, shared)).collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Mutex<Vec<Option<JobResult<'e>>>> =
        Mutex::new((0..jobs.len()).map(|_| None).collect());
    let outcome = crossbeam::scope(|scope| {
        for worker in 0..workers {
            let spawned = scope
                .builder()
                .name(format!("arklow-lower-{}", worker))
                .stack_size(WORKER_STACK_SIZE)
                .spawn(|_| loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(job) = jobs.get(index) else {
                        break;
                    };
                    let result = lower_job(job, shared);
                    slots.lock()[index] = Some(result);
                });
            if let Err(error) = spawned {
                warn!(worker, %error, "could not spawn lowering worker");
            }
        }
    });
    if let Err(panic) = outcome {
        std::panic::resume_unwind(panic);
    }
    // Jobs left over when no worker could be spawned run here.
    slots
        .into_inner()
        .into_iter()
        .zip(jobs)
        .map(|(slot, job)| slot.unwrap_or_else(|| lower_job(job, shared)))
        .collect()
}

fn lower_job<'e>(job: &LowerJob, shared: &Shared<'e>) -> JobResult<'e> {
    trace!(method = %job.context.signature, "lowering");
    let mut sink = CollectingSink::new(shared.interner, shared.builtins);
    let body = {
        let lowerer = Lowerer::new(
            &job.context,
            shared.source,
            shared.interner,
            shared.builtins,
            &mut sink,
            shared.config,
        );
        let input = match &job.source {
            JobSource::Block {
                params,
                statements,
                param_properties,
            } => BodyInput::Block {
                params,
                statements,
                param_properties: *param_properties,
            },
            JobSource::Expression { params, expression } => {
                BodyInput::Expression { params, expression }
            }
            JobSource::Initializers(inits) => BodyInput::Initializers(inits),
        };
        lowerer.lower_body(input)
    };
    JobResult { body, sink }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrettyPrint;

    fn config(jobs: usize) -> ArklowConfig {
        let mut config = ArklowConfig::default();
        config.lower.jobs = jobs;
        config.lower.origin_text = false;
        config
    }

    const SOURCE: &str = r#"
        function add(a: number, b: number): number { return a + b; }
        class Counter {
            count: number = 0;
            tick() { this.count += 1; const f = () => this.count; return f(); }
        }
        const total = add(1, 2);
        const point = { x: 1, y: 2 };
    "#;

    #[test]
    fn test_parallel_matches_sequential() {
        let source = SourceFile::new("counter.ts", SOURCE);
        let sequential = lower_source(&source, &config(1)).unwrap();
        let parallel = lower_source(&source, &config(4)).unwrap();
        assert_eq!(sequential.pretty_print(), parallel.pretty_print());
        assert!(sequential.failures.is_empty());
    }

    #[test]
    fn test_nested_declarations_become_methods() {
        let source = SourceFile::new("counter.ts", SOURCE);
        let model = lower_source(&source, &config(1)).unwrap();

        let counter = model.class("Counter").unwrap();
        assert!(counter.method("tick").unwrap().body.is_some());
        assert!(counter.method("%AM0$tick").unwrap().body.is_some());
        assert!(counter.method("%instInit").is_some());
        assert!(model.class("%AC0$%dflt").is_some());
        assert!(model.function_body("add").is_some());
    }

    #[test]
    fn test_deep_nesting_on_workers() {
        let depth = 500;
        let text = format!(
            "function g() {{ let x = {}1{}; }}\nfunction h() {{ return 2; }}",
            "[".repeat(depth),
            "]".repeat(depth)
        );
        // Parsing happens on the calling thread; give it room.
        let model = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(move || {
                let source = SourceFile::new("deep.ts", text);
                lower_source(&source, &config(4)).unwrap()
            })
            .unwrap()
            .join()
            .unwrap();

        let g = model.default_class().unwrap().method("g").unwrap();
        match &g.body {
            Some(body) => assert!(body.validate().is_ok()),
            None => assert!(matches!(
                model.failures[0].error,
                LowerError::DepthExceeded { .. }
            )),
        }
        assert!(model.function_body("h").is_some());
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let source = SourceFile::new("bad.ts", "let = ;");
        match lower_source(&source, &config(1)) {
            Err(LoadError::Parse { file, errors }) => {
                assert_eq!(file, "bad.ts");
                assert!(!errors.is_empty());
            }
            other => panic!("expected parse error, got {:?}", other.map(|m| m.classes.len())),
        }
    }
}
