//! Deployment states and the transitions between them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Progress of a deployment. Each state is reached only after the previous
/// state's transactions are confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    Start,
    Funded,
    Compiled,
    Published,
    Registered,
    Minted,
    Done,
}

impl DeployState {
    /// Transition leaving this state, `None` once done.
    pub fn next_transition(self) -> Option<Transition> {
        match self {
            DeployState::Start => Some(Transition::Fund),
            DeployState::Funded => Some(Transition::Compile),
            DeployState::Compiled => Some(Transition::Publish),
            DeployState::Published => Some(Transition::Register),
            DeployState::Registered => Some(Transition::Mint),
            DeployState::Minted => Some(Transition::Report),
            DeployState::Done => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == DeployState::Done
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeployState::Start => "start",
            DeployState::Funded => "funded",
            DeployState::Compiled => "compiled",
            DeployState::Published => "published",
            DeployState::Registered => "registered",
            DeployState::Minted => "minted",
            DeployState::Done => "done",
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Fund,
    Compile,
    Publish,
    Register,
    Mint,
    Report,
}

impl Transition {
    pub fn source(self) -> DeployState {
        match self {
            Transition::Fund => DeployState::Start,
            Transition::Compile => DeployState::Funded,
            Transition::Publish => DeployState::Compiled,
            Transition::Register => DeployState::Published,
            Transition::Mint => DeployState::Registered,
            Transition::Report => DeployState::Minted,
        }
    }

    pub fn target(self) -> DeployState {
        match self {
            Transition::Fund => DeployState::Funded,
            Transition::Compile => DeployState::Compiled,
            Transition::Publish => DeployState::Published,
            Transition::Register => DeployState::Registered,
            Transition::Mint => DeployState::Minted,
            Transition::Report => DeployState::Done,
        }
    }

    /// Whether repeating the step is harmless.
    ///
    /// Steps that submit transactions are not: a repeat either applies twice
    /// or is rejected by the chain.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Transition::Compile | Transition::Report)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Fund => "fund",
            Transition::Compile => "compile",
            Transition::Publish => "publish",
            Transition::Register => "register",
            Transition::Mint => "mint",
            Transition::Report => "report",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_is_linear() {
        let mut state = DeployState::Start;
        let mut visited = vec![state];
        while let Some(transition) = state.next_transition() {
            assert_eq!(transition.source(), state);
            state = transition.target();
            visited.push(state);
        }
        assert_eq!(
            visited,
            vec![
                DeployState::Start,
                DeployState::Funded,
                DeployState::Compiled,
                DeployState::Published,
                DeployState::Registered,
                DeployState::Minted,
                DeployState::Done,
            ]
        );
        assert!(state.is_terminal());
    }

    #[test]
    fn test_only_offline_steps_are_idempotent() {
        let submitting = [Transition::Fund, Transition::Publish, Transition::Register, Transition::Mint];
        assert!(submitting.iter().all(|t| !t.is_idempotent()));
        assert!(Transition::Compile.is_idempotent());
        assert!(Transition::Report.is_idempotent());
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&DeployState::Published).unwrap(), "\"published\"");
        assert_eq!(serde_json::to_string(&Transition::Mint).unwrap(), "\"mint\"");
    }
}
