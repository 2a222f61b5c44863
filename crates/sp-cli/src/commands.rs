use std::io::Write;
use std::path::Path;

use sp_core::HarnessError;
use sp_loader::{PythonHost, ScriptLoader, ScriptModule, SkipDecision};
use sp_parser::delimit_statements;
use sp_rewrite::{
    protect_ipython_magics, rewrite_source, MatplotlibImports, RewriteOptions, VisualizerImports,
    VisualizerTarget,
};
use tracing::warn;

use crate::cli_args::{LoadArgs, PreviewArgs, ScriptArgs};
use crate::error_map::{map_cli_output, map_loader_error};
use crate::param_args::{import_options, rewrite_options};
use crate::source_reader::{collect_scripts, read_script, resolve_path};

fn json_string(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}

pub(crate) fn run_preview(out: &mut dyn Write, args: PreviewArgs) -> Result<i32, HarnessError> {
    let options = rewrite_options(&args.rewrite)?;
    match (&args.script, &args.dir) {
        (_, Some(dir)) => preview_dir(out, dir, &options),
        (Some(script), None) => preview_script(out, script, &options),
        (None, None) => Err(HarnessError::new(
            "CLI_SOURCE_MISSING",
            "either a script or --dir is required",
        )),
    }
}

fn preview_script(
    out: &mut dyn Write,
    script: &Path,
    options: &RewriteOptions,
) -> Result<i32, HarnessError> {
    let path = resolve_path(script)?;
    let code = read_script(&path)?;
    let outcome = rewrite_source(&code, &path, options)?;

    writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
    writeln!(out, "SCRIPT:{}", path.display()).map_err(map_cli_output)?;
    if let Some(argv) = &outcome.argv {
        let argv = serde_json::to_string(argv).unwrap_or_else(|_| "[]".to_string());
        writeln!(out, "ARGV_JSON:{}", argv).map_err(map_cli_output)?;
    }
    writeln!(out, "SOURCE_JSON:{}", json_string(&outcome.code)).map_err(map_cli_output)?;
    Ok(0)
}

fn preview_dir(
    out: &mut dyn Write,
    dir: &Path,
    options: &RewriteOptions,
) -> Result<i32, HarnessError> {
    let scripts = collect_scripts(dir)?;
    let root = resolve_path(dir)?;
    let mut failed = 0usize;

    for script in &scripts {
        let relative = script
            .strip_prefix(&root)
            .unwrap_or(script)
            .to_string_lossy()
            .replace('\\', "/");
        let outcome = read_script(script).and_then(|code| rewrite_source(&code, script, options));
        match outcome {
            Ok(_) => writeln!(out, "FILE:{}|OK", relative).map_err(map_cli_output)?,
            Err(error) => {
                failed += 1;
                warn!(script = %relative, code = %error.code, "rewrite failed");
                writeln!(
                    out,
                    "FILE:{}|ERROR|{}|{}",
                    relative,
                    error.code,
                    json_string(&error.message)
                )
                .map_err(map_cli_output)?;
            }
        }
    }
    writeln!(out, "SUMMARY:ok={},failed={}", scripts.len() - failed, failed)
        .map_err(map_cli_output)?;

    if failed > 0 {
        return Err(HarnessError::new(
            "CLI_PREVIEW_FAILED",
            format!("{} of {} scripts failed to rewrite", failed, scripts.len()),
        ));
    }
    writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
    Ok(0)
}

pub(crate) fn run_statements(out: &mut dyn Write, args: ScriptArgs) -> Result<i32, HarnessError> {
    let code = read_script(&args.script)?;
    let statements = delimit_statements(&code)?;
    writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
    for (start, end) in statements {
        writeln!(out, "STATEMENT:{}-{}", start, end).map_err(map_cli_output)?;
    }
    Ok(0)
}

fn target_name(target: VisualizerTarget) -> &'static str {
    match target {
        VisualizerTarget::DeferredModule => "deferred-module",
        VisualizerTarget::DeferredClass => "deferred-class",
        VisualizerTarget::Eager => "eager",
    }
}

pub(crate) fn run_imports(out: &mut dyn Write, args: ScriptArgs) -> Result<i32, HarnessError> {
    let code = protect_ipython_magics(&read_script(&args.script)?);
    let plotting = MatplotlibImports::locate(&code)?;
    let visualizers = VisualizerImports::locate(&code)?;

    writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
    let first = match plotting.first {
        Some(first) => format!("{}:{}", first.line, first.column),
        None => "NONE".to_string(),
    };
    writeln!(out, "MATPLOTLIB_FIRST:{}", first).map_err(map_cli_output)?;
    for record in &plotting.matplotlib_aliases {
        writeln!(out, "MATPLOTLIB_ALIAS:{}|{}", record.alias, record.line).map_err(map_cli_output)?;
    }
    for record in &plotting.pyplot_aliases {
        writeln!(out, "PYPLOT_ALIAS:{}|{}", record.alias, record.line).map_err(map_cli_output)?;
    }
    for record in &visualizers.records {
        writeln!(
            out,
            "VISUALIZER:{}|{}-{}|{}",
            record.alias,
            record.span.start.line,
            record.span.end.line,
            target_name(record.target)
        )
        .map_err(map_cli_output)?;
    }
    Ok(0)
}

pub(crate) fn run_load(out: &mut dyn Write, args: LoadArgs) -> Result<i32, HarnessError> {
    let options = import_options(&args)?;
    let mut loader = ScriptLoader::new(PythonHost::from_env());
    let (module, decision) = loader
        .configure_and_import(&args.script, options)
        .map_err(map_loader_error)?;
    emit_load(out, &module, &decision)
}

fn emit_load(
    out: &mut dyn Write,
    module: &ScriptModule,
    decision: &SkipDecision,
) -> Result<i32, HarnessError> {
    match (decision, module) {
        (SkipDecision::Skip { reason }, _) => {
            writeln!(out, "RESULT:SKIP").map_err(map_cli_output)?;
            writeln!(out, "SKIP_REASON_JSON:{}", json_string(reason)).map_err(map_cli_output)?;
        }
        (SkipDecision::Run, ScriptModule::Loaded { name, path, bindings }) => {
            let bindings = serde_json::to_string(bindings).unwrap_or_else(|_| "{}".to_string());
            writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
            writeln!(out, "MODULE:{}", name).map_err(map_cli_output)?;
            writeln!(out, "OUTPUT:{}", path.display()).map_err(map_cli_output)?;
            writeln!(out, "BINDINGS_JSON:{}", bindings).map_err(map_cli_output)?;
        }
        (SkipDecision::Run, ScriptModule::Mock) => {
            writeln!(out, "RESULT:OK").map_err(map_cli_output)?;
            writeln!(out, "MODULE:NONE").map_err(map_cli_output)?;
        }
    }
    Ok(0)
}
