//! Scripted debugger session loaded from TOML.
//!
//! ```toml
//! expand = ["*p"]
//!
//! [[local]]
//! name = "p"
//! vdl = '(val name="p" value="0x10" (deref expr="*p"))'
//!
//! [[watch]]
//! id = 1
//! name = "count"
//! flags = 1
//!
//! [[chase]]
//! expr = "*p"
//! vdl = '(val name="*p" value="5")'
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use vdl_tree::{ChaseFailure, ChaseOutcome, ValueFlags, ValueItem};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Session {
    /// Identity keys to expand, in order.
    #[serde(default)]
    pub expand: Vec<String>,
    #[serde(default, rename = "local")]
    pub locals: Vec<LocalScript>,
    #[serde(default, rename = "watch")]
    pub watches: Vec<WatchScript>,
    #[serde(default, rename = "chase")]
    pub chases: Vec<ChaseScript>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocalScript {
    pub name: Option<String>,
    pub vdl: Option<String>,
    #[serde(default)]
    pub flags: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WatchScript {
    pub id: u32,
    pub name: Option<String>,
    pub vdl: Option<String>,
    #[serde(default)]
    pub flags: u32,
}

/// Canned reply for one dereference expression.
#[derive(Debug, Deserialize)]
pub(crate) struct ChaseScript {
    pub expr: String,
    pub vdl: Option<String>,
    #[serde(default)]
    pub flags: u32,
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: String,
}

impl Session {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid session {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

impl LocalScript {
    pub fn to_item(&self) -> ValueItem {
        ValueItem {
            name: self.name.clone(),
            vdl: self.vdl.clone(),
            flags: ValueFlags::from_bits(self.flags),
        }
    }
}

impl WatchScript {
    pub fn to_item(&self) -> ValueItem {
        ValueItem {
            name: self.name.clone(),
            vdl: self.vdl.clone(),
            flags: ValueFlags::from_bits(self.flags),
        }
    }
}

impl ChaseScript {
    pub fn outcome(&self) -> ChaseOutcome {
        match (&self.vdl, self.flags) {
            (Some(vdl), 0) => ChaseOutcome::Success(vdl.clone()),
            (_, flags) => ChaseOutcome::Failure(ChaseFailure {
                flags: if flags == 0 {
                    ValueFlags::ERROR
                } else {
                    ValueFlags::from_bits(flags)
                },
                name: self.name.clone().unwrap_or_else(|| self.expr.clone()),
                type_name: self.type_name.clone(),
            }),
        }
    }
}
