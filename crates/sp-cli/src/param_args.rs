use sp_core::{HarnessError, ParamValue};
use sp_loader::ImportOptions;
use sp_rewrite::{RewriteOptions, VariableSubstitutions};

use crate::cli_args::{LoadArgs, RewriteArgs};

/// Parses `NAME=VALUE`; the value is JSON when it parses, raw text otherwise.
pub(crate) fn parse_assignment(raw: &str) -> Result<(String, ParamValue), HarnessError> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(HarnessError::new(
            "CLI_SET_INVALID",
            format!("expected NAME=VALUE, got {raw:?}"),
        ));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(HarnessError::new(
            "CLI_SET_INVALID",
            format!("missing variable name in {raw:?}"),
        ));
    }
    Ok((name.to_string(), ParamValue::parse_loose(value.trim())))
}

fn variables(args: &RewriteArgs) -> Result<VariableSubstitutions, HarnessError> {
    let mut variables = VariableSubstitutions::new()
        .strings_as_is(args.strings_as_is)
        .keep_original(!args.drop_original);
    for raw in &args.set {
        let (name, value) = parse_assignment(raw)?;
        variables.insert(name, value);
    }
    Ok(variables)
}

fn cmd_arguments(args: &RewriteArgs) -> Option<Vec<String>> {
    (args.inject_argv || !args.args.is_empty()).then(|| args.args.clone())
}

pub(crate) fn rewrite_options(args: &RewriteArgs) -> Result<RewriteOptions, HarnessError> {
    Ok(RewriteOptions {
        variables: variables(args)?,
        cmd_arguments: cmd_arguments(args),
        mock_visualizers: !args.no_mock_visualizers,
        random_seeds: !args.no_random_seeds,
    })
}

pub(crate) fn import_options(args: &LoadArgs) -> Result<ImportOptions, HarnessError> {
    let rewrite = &args.rewrite;
    let mut options = ImportOptions::new()
        .gpu(args.gpu)
        .move_to_script_dir(!args.stay)
        .mock_visualizers(!rewrite.no_mock_visualizers)
        .random_seeds(!rewrite.no_random_seeds);
    options.variables = variables(rewrite)?;
    options.cmd_arguments = cmd_arguments(rewrite);
    if let Some(suffix) = &args.suffix {
        options = options.script_suffix(suffix.clone());
    }
    Ok(options)
}

#[cfg(test)]
mod param_args_tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn assignments_parse_json_then_raw() {
        assert_eq!(
            parse_assignment("N=500").expect("valid"),
            ("N".to_string(), ParamValue::Int(500))
        );
        assert_eq!(
            parse_assignment(" box_l = [1.5, 2] ").expect("valid"),
            (
                "box_l".to_string(),
                ParamValue::List(vec![ParamValue::Float(1.5), ParamValue::Int(2)])
            )
        );
        assert_eq!(
            parse_assignment("grid=np.ones(3)").expect("valid"),
            ("grid".to_string(), ParamValue::raw("np.ones(3)"))
        );
        assert_eq!(
            parse_assignment("expr=a==b").expect("valid").1,
            ParamValue::raw("a==b")
        );
        assert_eq!(parse_assignment("N").expect_err("no =").code, "CLI_SET_INVALID");
        assert_eq!(parse_assignment("=3").expect_err("no name").code, "CLI_SET_INVALID");
    }

    #[test]
    fn rewrite_flags_map_onto_options() {
        let args = RewriteArgs {
            set: vec!["N=1".to_string()],
            strings_as_is: true,
            drop_original: true,
            args: vec!["--steps".to_string(), "3".to_string()],
            inject_argv: false,
            no_mock_visualizers: true,
            no_random_seeds: false,
        };
        let options = rewrite_options(&args).expect("options should build");
        assert_eq!(options.variables.len(), 1);
        assert!(options.variables.strings_as_is);
        assert!(!options.variables.keep_original);
        assert_eq!(
            options.cmd_arguments,
            Some(vec!["--steps".to_string(), "3".to_string()])
        );
        assert!(!options.mock_visualizers);
        assert!(options.random_seeds);

        let defaults = rewrite_options(&RewriteArgs::default()).expect("options should build");
        assert_eq!(defaults, RewriteOptions::default());
    }

    #[test]
    fn load_flags_map_onto_import_options() {
        let args = LoadArgs {
            script: PathBuf::from("a.py"),
            rewrite: RewriteArgs::default(),
            suffix: Some("cli".to_string()),
            gpu: true,
            stay: true,
        };
        let options = import_options(&args).expect("options should build");
        assert!(options.gpu);
        assert!(!options.move_to_script_dir);
        assert_eq!(options.output_suffix(), "_cli_processed.py");
        assert_eq!(options.cmd_arguments, None);
    }

    #[test]
    fn inject_argv_without_arguments_sets_script_name_only() {
        let args = RewriteArgs {
            inject_argv: true,
            ..RewriteArgs::default()
        };
        let options = rewrite_options(&args).expect("options should build");
        assert_eq!(options.cmd_arguments, Some(Vec::new()));

        let load = LoadArgs {
            script: PathBuf::from("a.py"),
            rewrite: args,
            suffix: None,
            gpu: false,
            stay: false,
        };
        let options = import_options(&load).expect("options should build");
        assert_eq!(options.cmd_arguments, Some(Vec::new()));
    }
}
