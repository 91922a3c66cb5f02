use std::collections::HashSet;
use std::sync::Arc;

use super::{Greed, Parameter};
use crate::error::RegistrationError;

/// The validated parameters of one handler, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ParameterGroup {
    parameters: Vec<Arc<Parameter>>,
}

impl ParameterGroup {
    /// Validates and freezes a parameter list.
    ///
    /// Rejects duplicate labels or name tokens, non-flag parameters that
    /// consume zero tokens, and an infinite-greed indexed parameter followed
    /// by another indexed one. Indexed positions are assigned in order.
    pub fn new(parameters: Vec<Parameter>) -> Result<Self, RegistrationError> {
        let mut labels = HashSet::new();
        let mut names = HashSet::new();
        let mut greedy_indexed: Option<String> = None;
        let mut frozen = Vec::with_capacity(parameters.len());
        let mut position = 0;

        for mut parameter in parameters {
            if !labels.insert(parameter.label().to_string()) {
                return Err(RegistrationError::DuplicateParameter(parameter.label().to_string()));
            }
            for name in parameter.names() {
                if !names.insert(name.to_string()) {
                    return Err(RegistrationError::DuplicateParameter(name.to_string()));
                }
            }
            if !parameter.is_flag() && parameter.get_greed() == Greed::Fixed(0) {
                return Err(RegistrationError::ZeroGreed(parameter.label().to_string()));
            }
            if parameter.is_indexed() {
                if let Some(greedy) = greedy_indexed.take() {
                    return Err(RegistrationError::GreedyNotLast(greedy));
                }
                if parameter.get_greed() == Greed::Infinite {
                    greedy_indexed = Some(parameter.label().to_string());
                }
                parameter.set_position(position);
                position += 1;
            }
            frozen.push(Arc::new(parameter));
        }

        Ok(Self { parameters: frozen })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// All parameters in declaration order.
    pub fn parameters(&self) -> &[Arc<Parameter>] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Index of the flag named exactly `token`.
    pub(crate) fn find_flag(&self, token: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| p.is_flag() && p.matches_name(token))
    }

    /// Index of the named parameter called exactly `token`.
    pub(crate) fn find_named(&self, token: &str) -> Option<usize> {
        self.parameters
            .iter()
            .position(|p| p.is_named() && p.matches_name(token))
    }

    /// Indices of the indexed parameters, in position order.
    pub(crate) fn indexed(&self) -> Vec<usize> {
        self.parameters
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_indexed())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn get(&self, label: &str) -> Option<&Arc<Parameter>> {
        self.parameters.iter().find(|p| p.label() == label)
    }
}
