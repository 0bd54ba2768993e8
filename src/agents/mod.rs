//! Agents module - the four fixed roles of the crew.
//!
//! # Roles (pipeline order)
//! - **Software Architect**: breaks the task into a plan
//! - **Senior Python Developer**: writes the implementation
//! - **Code Reviewer**: reviews and suggests improvements
//! - **Test Engineer**: writes the pytest suite
//!
//! An agent is a profile (role, goal, backstory) plus a [`RoleAgent`] that
//! turns one step prompt into one chat completion.

mod role;

pub use role::{AgentError, RoleAgent};

use serde::{Deserialize, Serialize};

/// The fixed roles, in the order the crew runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Architect,
    Coder,
    Reviewer,
    Tester,
}

impl AgentRole {
    pub const PIPELINE: [AgentRole; 4] = [
        AgentRole::Architect,
        AgentRole::Coder,
        AgentRole::Reviewer,
        AgentRole::Tester,
    ];

    /// Name shown in the chat log and status line.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Architect => "Software Architect",
            AgentRole::Coder => "Senior Python Developer",
            AgentRole::Reviewer => "Code Reviewer",
            AgentRole::Tester => "Test Engineer",
        }
    }

    pub fn profile(&self) -> AgentProfile {
        let (goal, backstory) = match self {
            AgentRole::Architect => (
                "Break down complex tasks into clear, actionable steps",
                "You are an experienced software architect with a track record of breaking \
                 down complex projects into manageable tasks. You excel at identifying \
                 dependencies and potential challenges.",
            ),
            AgentRole::Coder => (
                "Write clean, efficient, and well-documented Python code",
                "You are a senior Python developer with expertise in writing \
                 production-ready code. You follow best practices and ensure code quality.",
            ),
            AgentRole::Reviewer => (
                "Ensure code quality and identify potential issues",
                "You are a meticulous code reviewer with years of experience in Python \
                 development. You have a keen eye for detail and best practices.",
            ),
            AgentRole::Tester => (
                "Create comprehensive test suites for Python code",
                "You are an expert in Python testing, specializing in pytest. You ensure \
                 code reliability through thorough testing.",
            ),
        };
        AgentProfile {
            role: *self,
            goal: goal.to_string(),
            backstory: backstory.to_string(),
        }
    }
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Prompt-side description of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub role: AgentRole,
    pub goal: String,
    pub backstory: String,
}

impl AgentProfile {
    /// System message that puts the model in character.
    pub fn system_prompt(&self) -> String {
        format!(
            "You are {}. {}\nYour personal goal is: {}",
            self.role.display_name(),
            self.backstory,
            self.goal
        )
    }
}
