use crate::JSError;
use crate::core::{CompileOptions, Interpreter, ParseGoal, ScriptId, collect_breakable_locations, parse_program};
use crate::js_function::FunctionTemplate;
use indexmap::IndexMap;
use serde_json::json;
use std::rc::Rc;

/// A compiled (or failed) source text known to the session.
#[derive(Debug, Clone)]
pub struct Script {
    pub id: ScriptId,
    pub url: String,
    pub source: String,
    pub line_offset: usize,
    pub column_offset: usize,
    /// Statement starts where execution can stop, in source order.
    pub locations: Vec<(usize, usize)>,
    pub failed: bool,
}

impl Script {
    fn end_position(&self) -> (usize, usize) {
        let lines: Vec<&str> = self.source.split('\n').collect();
        let last = lines.last().map(|l| l.chars().count()).unwrap_or(0);
        let end_line = self.line_offset + lines.len().saturating_sub(1);
        let end_column = if lines.len() <= 1 { self.column_offset + last } else { last };
        (end_line, end_column)
    }

    fn protocol_params(&self) -> serde_json::Value {
        let (end_line, end_column) = self.end_position();
        json!({
            "scriptId": self.id.to_string(),
            "url": self.url,
            "startLine": self.line_offset,
            "startColumn": self.column_offset,
            "endLine": end_line,
            "endColumn": end_column,
        })
    }
}

#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: IndexMap<ScriptId, Script>,
    next_id: u32,
}

impl ScriptRegistry {
    pub fn next_id(&mut self) -> ScriptId {
        self.next_id += 1;
        ScriptId(self.next_id)
    }

    /// Id handed out most recently.
    pub fn last_id(&self) -> ScriptId {
        ScriptId(self.next_id)
    }

    pub fn insert(&mut self, script: Script) {
        self.scripts.insert(script.id, script);
    }

    pub fn get(&self, id: ScriptId) -> Option<&Script> {
        self.scripts.get(&id)
    }

    pub fn url_of(&self, id: ScriptId) -> Option<String> {
        self.scripts.get(&id).map(|s| s.url.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Script> {
        self.scripts.values()
    }

    /// Compiled scripts loaded from `url`.
    pub fn by_url<'a>(&'a self, url: &'a str) -> impl Iterator<Item = &'a Script> {
        self.scripts.values().filter(move |s| s.url == url && !s.failed)
    }
}

impl Interpreter {
    /// Compiles `source` and records it as a script, announcing it to an
    /// enabled debugger. A failed compilation is recorded too.
    pub(crate) fn compile_script(
        &mut self,
        source: &str,
        url: &str,
        goal: ParseGoal,
        line_offset: usize,
        column_offset: usize,
        params: &[String],
    ) -> Result<Rc<FunctionTemplate>, JSError> {
        let id = self.scripts.next_id();
        let options = CompileOptions {
            line_offset,
            column_offset,
            params: params.to_vec(),
            allow_natives_syntax: self.config.allow_natives_syntax,
            ..CompileOptions::new(id, goal)
        };
        let compiled = parse_program(source, &options);
        let mut script = Script {
            id,
            url: url.to_string(),
            source: source.to_string(),
            line_offset,
            column_offset,
            locations: Vec::new(),
            failed: compiled.is_err(),
        };
        match &compiled {
            Ok(template) => {
                collect_breakable_locations(&template.body, &mut script.locations);
                script.locations.sort_unstable();
                script.locations.dedup();
                log::debug!("script {} '{}' compiled, {} breakable locations", id, url, script.locations.len());
            }
            Err(e) => log::debug!("script {} '{}' failed to compile: {}", id, url, e),
        }
        self.scripts.insert(script);
        self.announce_script(id);
        if compiled.is_ok() {
            self.resolve_pending_breakpoints(id);
        }
        compiled
    }

    /// `Debugger.scriptParsed` or `Debugger.scriptFailedToParse` for `id`.
    pub(crate) fn announce_script(&self, id: ScriptId) {
        if !self.debugger.enabled {
            return;
        }
        if let Some(script) = self.scripts.get(id) {
            let method = if script.failed { "Debugger.scriptFailedToParse" } else { "Debugger.scriptParsed" };
            self.notify(method, script.protocol_params());
        }
    }
}
