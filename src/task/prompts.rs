//! Step prompt templates, one per role.
//!
//! The headings requested here (`IMPLEMENTATION:`, `TESTS:`,
//! `SUGGESTED IMPROVEMENTS:`) are the ones the code-block extractor tags.

use crate::agents::AgentRole;

/// Prompt for `role`'s step of `user_task`.
///
/// Review and testing prompts do not embed the task; they work from the
/// previous steps' output.
pub fn step_prompt(role: AgentRole, user_task: &str) -> String {
    match role {
        AgentRole::Architect => format!(
            r#"Analyze the following task and break it down into clear, actionable steps: {user_task}

Provide a detailed plan with 5-7 steps, focusing on technical implementation details.
Each step should be complete and actionable.

Format your response as:
PLAN:
[Your detailed plan here]

IMPLEMENTATION:
```python
[Your implementation code here]
```

TESTS:
```python
[Your test code here]
```"#
        ),
        AgentRole::Coder => format!(
            r#"Based on the plan provided, write Python code to accomplish the following task: {user_task}

Include:
- All necessary imports
- Error handling
- Documentation
- Type hints where appropriate

Format your response as:
IMPLEMENTATION:
```python
[Your implementation code here]
```

EXPLANATION:
[Your explanation of the code here]"#
        ),
        AgentRole::Reviewer => r#"Review the generated code and provide feedback on:
- Code quality
- Best practices
- Potential improvements
- Security concerns

Be thorough and specific in your review.

Format your response as:
REVIEW:
[Your detailed review here]

SUGGESTED IMPROVEMENTS:
```python
[Your improved code here if any]
```"#
            .to_string(),
        AgentRole::Tester => r#"Create comprehensive unit tests for the generated code using pytest.
Include:
- Edge cases
- Error scenarios
- Input validation
- Expected outputs

Ensure high test coverage.

Format your response as:
TESTS:
```python
[Your test code here]
```

TEST EXPLANATION:
[Your explanation of the tests here]"#
            .to_string(),
    }
}
