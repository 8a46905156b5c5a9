//! Region assembly: gathers emitted blocks into one serializable unit and
//! checks that name-based connectivity resolves across blocks.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::block::{fmt_block, write_line, BasicBlock, BlockSerdeError, TensorDeclaration};
use crate::error::{LegalizeError, LegalizeResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

impl Region {
    pub fn block(&self, name: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn tensor(&self, name: &str) -> Option<&TensorDeclaration> {
        self.blocks.iter().find_map(|block| block.tensor(name))
    }

    pub fn to_json_string(&self) -> Result<String, BlockSerdeError> {
        serde_json::to_string_pretty(self).map_err(BlockSerdeError::from)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, BlockSerdeError> {
        bincode::serialize(self).map_err(BlockSerdeError::from)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_line(f, 0, &format!("region @{} {{", self.name))?;
        for block in &self.blocks {
            fmt_block(block, 1, f)?;
        }
        write_line(f, 0, "}")
    }
}

#[derive(Debug, Clone)]
pub struct RegionBuilder {
    name: String,
    blocks: Vec<BasicBlock>,
}

impl RegionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: BasicBlock) -> &mut Self {
        self.blocks.push(block);
        self
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Validates cross-block connectivity: every tensor name has one
    /// declaration and at most one producer in the region, and every operator
    /// input resolves to a declaration. Blocks may repeat an identical
    /// declaration of a tensor they only consume.
    pub fn finish(self) -> LegalizeResult<Region> {
        let mut block_names = HashSet::with_capacity(self.blocks.len());
        let mut owners: HashMap<&str, (&str, &TensorDeclaration)> = HashMap::new();
        let mut producers: HashMap<&str, &str> = HashMap::new();

        for block in &self.blocks {
            if block.region != self.name {
                return Err(LegalizeError::invalid_block(format!(
                    "{}: region tag '{}' does not match region '{}'",
                    block.name, block.region, self.name
                )));
            }
            if !block_names.insert(block.name.as_str()) {
                return Err(LegalizeError::invalid_block(format!(
                    "block name '{}' used more than once",
                    block.name
                )));
            }
            block.validate()?;
            for name in block.operators.iter().flat_map(|op| &op.outputs) {
                if let Some(owner) = producers.insert(name.as_str(), block.name.as_str()) {
                    return Err(LegalizeError::invalid_block(format!(
                        "tensor '{name}' produced by both {owner} and {}",
                        block.name
                    )));
                }
            }
            for tensor in &block.tensors {
                match owners.get(tensor.name.as_str()) {
                    // A graph input feeding several blocks is declared by each of them.
                    Some((_, existing)) if *existing == tensor => {}
                    Some((owner, _)) => {
                        return Err(LegalizeError::invalid_block(format!(
                            "tensor '{}' declared differently by {owner} and {}",
                            tensor.name, block.name
                        )));
                    }
                    None => {
                        owners.insert(tensor.name.as_str(), (block.name.as_str(), tensor));
                    }
                }
            }
        }

        for block in &self.blocks {
            for op in &block.operators {
                for name in &op.inputs {
                    if !owners.contains_key(name.as_str()) {
                        return Err(LegalizeError::invalid_block(format!(
                            "{}: input '{name}' is never declared in region '{}'",
                            block.name, self.name
                        )));
                    }
                }
            }
        }

        Ok(Region {
            name: self.name,
            blocks: self.blocks,
        })
    }
}
