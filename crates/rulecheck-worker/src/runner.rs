//! Runs one rule over one test case inside a worker.

use crate::linter::{LintRequest, RuleFailure, lint};
use crate::modules::ModuleHost;
use crate::protocol::{CallArgs, TestCaseConfig, WorkerError};
use crate::rule::RuleError;
use indexmap::IndexMap;
use rulecheck_common::NormalizedResult;
use rulecheck_common::limits::TEST_PLUGIN_NAMESPACE;
use rulecheck_eval::globals::own_entries;
use rulecheck_eval::{Value, evaluate};
use serde_json::Value as Json;
use tracing::{debug, trace};

pub struct RuleRunner {
    host: ModuleHost,
    default_filename: String,
}

impl RuleRunner {
    pub fn new(host: ModuleHost, default_filename: String) -> RuleRunner {
        RuleRunner {
            host,
            default_filename,
        }
    }

    pub fn host(&self) -> &ModuleHost {
        &self.host
    }

    pub fn run(&mut self, args: &CallArgs) -> Result<NormalizedResult, WorkerError> {
        let rule = self.host.load_rule(&args.rule_address)?;
        let config = self.resolve_config(&args.config);

        let code = match config.get("code") {
            Some(Value::String(code)) => code.to_string(),
            _ => {
                return Err(RuleError::InvalidConfig("`code` must be a string".to_string()).into());
            }
        };
        let filename = match config.get("filename") {
            None | Some(Value::Undefined) => self.default_filename.clone(),
            Some(Value::String(filename)) => filename.to_string(),
            Some(_) => {
                return Err(RuleError::InvalidConfig("`filename` must be a string".to_string()).into());
            }
        };
        let options = match config.get("options") {
            None | Some(Value::Undefined) => Vec::new(),
            Some(Value::Array(items)) => items.to_vec(),
            Some(_) => {
                return Err(RuleError::InvalidConfig("`options` must be an array".to_string()).into());
            }
        };
        let settings = match config.get("settings") {
            None | Some(Value::Undefined) => Value::object(IndexMap::new()),
            Some(settings) => settings.clone(),
        };
        let mut language_options: IndexMap<String, Value> = IndexMap::new();
        language_options.insert("ecmaVersion".to_string(), Value::string("latest"));
        language_options.insert("sourceType".to_string(), Value::string("module"));
        if let Some(given) = config.get("languageOptions") {
            language_options.extend(own_entries(given).unwrap_or_default());
        }
        let language_options = Value::object(language_options);

        let rule_id = format!("{TEST_PLUGIN_NAMESPACE}/{}", args.rule_name);
        debug!(rule = %rule_id, filename = %filename, "running rule");
        let request = LintRequest {
            rule_id: &rule_id,
            source: &code,
            filename: &filename,
            options: &options,
            settings: &settings,
            language_options: &language_options,
        };
        lint(rule.as_ref(), &request).map_err(WorkerError::from)
    }

    /// Build the effective config of a test case.
    ///
    /// The constructor config supplies defaults. Literal fields come next.
    /// Deferred properties are evaluated only when no literal was given, and
    /// are left out when their value cannot be determined.
    pub fn resolve_config(&mut self, config: &TestCaseConfig) -> IndexMap<String, Value> {
        let mut resolved = IndexMap::new();
        if let Some(constructor) = &config.constructor_ast {
            match evaluate(constructor, &mut self.host) {
                Some(defaults) => resolved.extend(own_entries(&defaults).unwrap_or_default()),
                None => debug!("constructor config is not determinable"),
            }
        }
        for (key, json) in &config.fields {
            resolved.insert(key.clone(), Value::from_json(json));
        }
        for (key, expression) in &config.ast {
            if config.fields.contains_key(key) {
                continue;
            }
            match evaluate(expression, &mut self.host) {
                Some(value) => {
                    trace!(key = %key, "deferred config property evaluated");
                    resolved.insert(key.clone(), value);
                }
                None => debug!(key = %key, "config property is not determinable"),
            }
        }
        resolved
    }
}

impl From<RuleError> for WorkerError {
    fn from(error: RuleError) -> WorkerError {
        match error {
            RuleError::Thrown {
                message,
                properties,
            } => WorkerError {
                message,
                properties,
            },
            other => WorkerError::new(other.to_string()),
        }
    }
}

impl From<RuleFailure> for WorkerError {
    fn from(failure: RuleFailure) -> WorkerError {
        let mut error = WorkerError::from(failure.error)
            .with_property("ruleId", failure.rule_id)
            .with_property("filename", failure.filename);
        if let Some(line) = failure.line {
            error.properties.insert("line".to_string(), Json::from(line));
        }
        error
    }
}

#[cfg(test)]
#[path = "tests/runner_unit_tests.rs"]
mod tests;
