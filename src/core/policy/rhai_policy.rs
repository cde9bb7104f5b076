use super::{PolicyProvider, POLICY_FUNCTIONS};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use rhai::{Array, CallFnOptions, Dynamic, Engine, FuncArgs, Scope, AST, INT};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

/// Policy backed by Rhai scripts.
///
/// The optional filter script is loaded first and the policy script second, so a
/// function defined in both resolves to the policy script's version.
pub struct RhaiPolicy {
    engine: Engine,
    ast: AST,
    scope: Mutex<Scope<'static>>,
    defined: HashSet<String>,
}

impl RhaiPolicy {
    pub fn load(policy_script: &Path, filter_script: Option<&Path>) -> Result<Self, AppError> {
        let mut sources = Vec::with_capacity(2);
        if let Some(filter) = filter_script {
            sources.push((filter.display().to_string(), read_script(filter)?));
        }
        sources.push((policy_script.display().to_string(), read_script(policy_script)?));
        Self::from_sources(&sources)
    }

    /// Build from `(name, code)` pairs, later sources overriding earlier ones.
    pub fn from_sources(sources: &[(String, String)]) -> Result<Self, AppError> {
        let engine = policy_engine();
        let mut ast = AST::empty();
        for (name, code) in sources {
            let compiled = engine.compile(code).map_err(|err| {
                AppError::new(
                    ErrorCategory::PolicyError,
                    format!("policy script {} failed to compile: {}", name, err),
                )
                .with_code("POL-002")
                .with_severity(crate::core::types::ErrorSeverity::Fatal)
            })?;
            ast = ast.merge(&compiled);
        }

        let mut scope = Scope::new();
        engine.run_ast_with_scope(&mut scope, &ast).map_err(|err| {
            AppError::new(
                ErrorCategory::PolicyError,
                format!("policy script failed while loading: {}", err),
            )
            .with_code("POL-003")
            .with_severity(crate::core::types::ErrorSeverity::Fatal)
        })?;

        let defined = ast
            .iter_functions()
            .map(|func| func.name.to_string())
            .collect::<HashSet<_>>();
        tracing::debug!(functions = ?defined, "policy loaded");

        Ok(RhaiPolicy {
            engine,
            ast,
            scope: Mutex::new(scope),
            defined,
        })
    }

    pub fn defines(&self, function: &str) -> bool {
        self.defined.contains(function)
    }

    /// Known policy functions the scripts define, in table order.
    pub fn defined_functions(&self) -> Vec<&'static str> {
        POLICY_FUNCTIONS
            .iter()
            .copied()
            .filter(|name| self.defines(name))
            .collect()
    }

    fn call(&self, function: &str, args: impl FuncArgs) -> Option<Dynamic> {
        if !self.defines(function) {
            tracing::trace!(function, "policy function not defined");
            return None;
        }
        let mut scope = match self.scope.lock() {
            Ok(scope) => scope,
            Err(poisoned) => poisoned.into_inner(),
        };
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true);
        match self
            .engine
            .call_fn_with_options::<Dynamic>(options, &mut scope, &self.ast, function, args)
        {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::error!(function, error = %err, "policy function failed");
                None
            }
        }
    }

    fn call_list(&self, function: &str, args: impl FuncArgs) -> Option<Vec<String>> {
        self.call(function, args)
            .and_then(to_strings)
            .filter(|list| !list.is_empty())
    }

    fn call_string(&self, function: &str, args: impl FuncArgs) -> Option<String> {
        self.call(function, args)
            .and_then(to_string)
            .filter(|value| !value.is_empty())
    }

    fn call_bool(&self, function: &str, args: impl FuncArgs) -> bool {
        self.call(function, args).map(to_bool).unwrap_or(false)
    }
}

impl PolicyProvider for RhaiPolicy {
    fn filter_db_entry(&self, argv: &[String], file: &str, directory: &str, exe: &str) -> bool {
        if !self.defines("FilterDBEntry") {
            return true;
        }
        self.call_bool(
            "FilterDBEntry",
            (
                to_array(argv),
                file.to_string(),
                directory.to_string(),
                exe.to_string(),
            ),
        )
    }

    fn s2s_extension(&self) -> Option<String> {
        self.call_string("GetS2SExtension", ())
    }

    fn s2s_command_line(
        &self,
        args: &[String],
        input: &Path,
        output: Option<&Path>,
        exe: &str,
    ) -> Option<Vec<String>> {
        self.call_list(
            "GetS2SCommandLine",
            (
                to_array(args),
                path_arg(Some(input)),
                path_arg(output),
                exe.to_string(),
            ),
        )
    }

    fn is_s2s_ok(&self, exit_code: i32) -> bool {
        self.call_bool("IsS2SOk", (exit_code as INT,))
    }

    fn editor_extension(&self) -> Option<String> {
        self.call_string("GetEditorExtension", ())
    }

    fn editor_command_line(
        &self,
        args: &[String],
        input: Option<&Path>,
        output: &Path,
        exe: &str,
    ) -> Option<Vec<String>> {
        self.call_list(
            "GetEditorCommandLine",
            (
                to_array(args),
                path_arg(input),
                path_arg(Some(output)),
                exe.to_string(),
            ),
        )
    }

    fn is_editor_ok(&self, exit_code: i32) -> bool {
        self.call_bool("IsEditorOk", (exit_code as INT,))
    }

    fn test_configurations(&self, exe: &str, extension: &str) -> Vec<String> {
        self.call_list(
            "GetTestConfigurations",
            (exe.to_string(), extension.to_string()),
        )
        .unwrap_or_default()
    }

    fn test_stages(&self, configuration: &str) -> Vec<String> {
        self.call_list("GetTestStages", (configuration.to_string(),))
            .unwrap_or_default()
    }

    fn test_extension(&self, stage: &str) -> Option<String> {
        self.call_string("GetTestExtension", (stage.to_string(),))
    }

    fn test_command_line(
        &self,
        args: &[String],
        configuration: &str,
        stage: &str,
        input: &Path,
        output: &Path,
    ) -> Option<Vec<String>> {
        self.call_list(
            "GetTestCommandLine",
            (
                to_array(args),
                configuration.to_string(),
                stage.to_string(),
                path_arg(Some(input)),
                path_arg(Some(output)),
            ),
        )
    }

    fn is_test_ok(&self, exit_code: i32, stage: &str) -> bool {
        self.call_bool("IsTestOk", (exit_code as INT, stage.to_string()))
    }

    fn diff_command_line(&self, original: &Path, edited: &Path) -> Option<Vec<String>> {
        self.call_list(
            "GetDiffCommandLine",
            (path_arg(Some(original)), path_arg(Some(edited))),
        )
    }

    fn is_diff_ok(&self, exit_code: i32) -> bool {
        self.call_bool("IsDiffOk", (exit_code as INT,))
    }

    fn is_overwrite_ok(&self) -> bool {
        self.call_bool("IsOverWriteOk", ())
    }
}

fn policy_engine() -> Engine {
    let mut engine = Engine::new();
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(128, 64);
    engine.on_print(|text| tracing::info!(target: "policy", "{}", text));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(target: "policy", source = source.unwrap_or("-"), %pos, "{}", text)
    });
    engine
}

fn read_script(path: &Path) -> Result<String, AppError> {
    std::fs::read_to_string(path).map_err(|err| {
        AppError::with_source(
            ErrorCategory::PolicyError,
            format!("failed to read policy script {}", path.display()),
            err,
        )
        .with_code("POL-001")
        .with_severity(crate::core::types::ErrorSeverity::Fatal)
    })
}

fn to_array(values: &[String]) -> Array {
    values.iter().cloned().map(Dynamic::from).collect()
}

fn path_arg(path: Option<&Path>) -> String {
    path.map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn to_strings(value: Dynamic) -> Option<Vec<String>> {
    if value.is_unit() {
        return None;
    }
    let array = value.into_array().ok()?;
    Some(
        array
            .into_iter()
            .filter(|item| !item.is_unit())
            .map(|item| {
                if item.is_string() {
                    item.into_string().unwrap_or_default()
                } else {
                    item.to_string()
                }
            })
            .collect(),
    )
}

fn to_string(value: Dynamic) -> Option<String> {
    if value.is_unit() {
        return None;
    }
    if value.is_string() {
        return value.into_string().ok();
    }
    Some(value.to_string())
}

/// Scripts may answer with a bool or with the integer 1 for "yes".
fn to_bool(value: Dynamic) -> bool {
    if let Ok(flag) = value.as_bool() {
        return flag;
    }
    matches!(value.as_int(), Ok(1))
}
