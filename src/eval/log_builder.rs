use crate::model::feature::ActivationConstraint;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct EvalLogBuilder {
    content: String,
    indent: usize,
}

impl EvalLogBuilder {
    const NEW_LINE_CHAR: char = '\n';
    const INDENT_SEQ: &'static str = "  ";

    pub fn inc_indent(mut self) -> Self {
        self.indent += 1;
        self
    }

    pub fn dec_indent(mut self) -> Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    pub fn new_ln(mut self, message: Option<&str>) -> Self {
        self.content.push(Self::NEW_LINE_CHAR);
        self.content
            .push_str(Self::INDENT_SEQ.repeat(self.indent).as_str());
        if let Some(msg) = message {
            self.content.push_str(msg)
        }
        self
    }

    pub fn append(mut self, val: impl Into<String>) -> Self {
        self.content.push_str(val.into().as_str());
        self
    }

    pub fn append_constraint(self, constraint: &ActivationConstraint) -> Self {
        let sorted: BTreeMap<&String, &String> = constraint.parameters.iter().collect();
        let params = sorted
            .iter()
            .map(|(key, value)| format!("{key}: '{value}'"))
            .collect::<Vec<String>>()
            .join(", ");
        self.new_ln(Some(
            format!("Strategy '{}' {{{params}}}", constraint.name).as_str(),
        ))
    }

    pub fn append_result(self, enabled: bool) -> Self {
        if enabled {
            self.append(" => MATCH, enabling feature")
        } else {
            self.append(" => no match")
        }
    }

    pub fn content(&self) -> &str {
        self.content.as_str()
    }
}
