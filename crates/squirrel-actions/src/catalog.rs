//! Static action registry and validated action instances.

use indexmap::IndexMap;

use crate::error::{ActionError, Result};
use crate::kinds::KINDS;
use crate::params::{self, ParamSpec, Params};

/// One action kind: its parameter declarations plus the describe/generate
/// functions. Definitions are plain statics, so the set of kinds is fixed
/// at compile time.
#[derive(Debug)]
pub struct KindDef {
    pub name: &'static str,
    pub params: &'static [ParamSpec],
    pub(crate) describe: fn(&Params) -> String,
    pub(crate) generate: fn(&Params) -> Result<String>,
}

/// Lookup table over the built-in kinds.
pub struct Catalog {
    kinds: IndexMap<&'static str, &'static KindDef>,
}

impl Catalog {
    pub fn builtin() -> Self {
        let kinds = KINDS.iter().map(|def| (def.name, def)).collect();
        Self { kinds }
    }

    pub fn get(&self, name: &str) -> Option<&'static KindDef> {
        self.kinds.get(name).copied()
    }

    pub fn kind_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.kinds.keys().copied()
    }

    pub fn defs(&self) -> impl Iterator<Item = &'static KindDef> + '_ {
        self.kinds.values().copied()
    }

    /// Validate the submitted parameters against the kind's declarations
    /// and bind them into an instance.
    pub fn instantiate(&self, kind: &str, mut params: Params) -> Result<ActionInstance> {
        let def = self
            .get(kind)
            .ok_or_else(|| ActionError::UnknownKind(kind.to_string()))?;
        params::validate(def.params, &mut params)?;
        tracing::debug!(kind, "instantiated action");
        Ok(ActionInstance { def, params })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A kind bound to validated parameters.
#[derive(Debug)]
pub struct ActionInstance {
    def: &'static KindDef,
    params: Params,
}

impl ActionInstance {
    pub fn kind(&self) -> &'static str {
        self.def.name
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Human-readable label; this is what ends up in the trailer tag.
    pub fn describe(&self) -> String {
        (self.def.describe)(&self.params)
    }

    /// The statement body, without trailer.
    pub fn generate(&self) -> Result<String> {
        (self.def.generate)(&self.params)
    }

    /// The loggable form: the statement body with exactly one
    /// `#sq_action:` trailer appended to its last physical line.
    pub fn snippet(&self) -> Result<String> {
        let body = self.generate()?;
        let label = self.describe().replace(['\n', '\r'], " ");
        let mut lines: Vec<String> = body.lines().map(str::to_string).collect();
        match lines.last_mut() {
            Some(last) => *last = format!("{last}  #sq_action:{label}"),
            None => lines.push(format!("#sq_action:{label}")),
        }
        Ok(lines.join("\n"))
    }
}
