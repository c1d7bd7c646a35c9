// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Capacity problems (agent count, board size) are caught here, before any shared
//! segment is created or any child process is spawned.

use crate::{ConfigError, ConfigResult, GridlockConfig, MAX_AGENTS};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    AgentCount { count: usize },
    BoardTooSmall { width: u16, height: u16, agents: usize },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AgentCount { count } => {
                write!(
                    f,
                    "processes.agents has {} entries (allowed: 1-{})",
                    count, MAX_AGENTS
                )
            }
            Self::BoardTooSmall {
                width,
                height,
                agents,
            } => {
                write!(
                    f,
                    "board {}x{} cannot hold {} agents",
                    width, height, agents
                )
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Agent count (1-9)
/// - Board extents and capacity
/// - Reward range and timing values
/// - Segment names
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &GridlockConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

/// Same checks as [`validate_config`], returned individually
pub fn collect_errors(config: &GridlockConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_agents(config, &mut errors);
    validate_board(config, &mut errors);
    validate_schedule(config, &mut errors);
    validate_shm(config, &mut errors);
    errors
}

fn validate_agents(config: &GridlockConfig, errors: &mut Vec<ConfigValidationError>) {
    let count = config.processes.agents.len();
    if count == 0 || count > MAX_AGENTS {
        errors.push(ConfigValidationError::AgentCount { count });
    }
    for (slot, path) in config.processes.agents.iter().enumerate() {
        if path.as_os_str().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: format!("processes.agents[{}]", slot),
            });
        }
    }
    if let Some(observer) = &config.processes.observer {
        if observer.as_os_str().is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: "processes.observer".to_string(),
            });
        }
    }
}

fn validate_board(config: &GridlockConfig, errors: &mut Vec<ConfigValidationError>) {
    let board = &config.board;
    if board.width == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "board.width".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if board.height == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "board.height".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let cells = board.width as usize * board.height as usize;
    let agents = config.processes.agents.len();
    if cells > 0 && agents > cells {
        errors.push(ConfigValidationError::BoardTooSmall {
            width: board.width,
            height: board.height,
            agents,
        });
    }

    if board.min_reward < 1 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "board.min_reward".to_string(),
            reason: "rewards must be strictly positive".to_string(),
        });
    }
    if board.max_reward < board.min_reward {
        errors.push(ConfigValidationError::InvalidValue {
            field: "board.max_reward".to_string(),
            reason: format!("{} is below min_reward {}", board.max_reward, board.min_reward),
        });
    }
}

fn validate_schedule(config: &GridlockConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.schedule.timeout_secs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "schedule.timeout_secs".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    if config.schedule.poll_interval_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "schedule.poll_interval_ms".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
}

fn validate_shm(config: &GridlockConfig, errors: &mut Vec<ConfigValidationError>) {
    let shm = &config.shm;
    for (field, name) in [("shm.state_name", &shm.state_name), ("shm.sync_name", &shm.sync_name)] {
        if name.is_empty() {
            errors.push(ConfigValidationError::MissingRequired {
                field: field.to_string(),
            });
        } else if name.contains('/') {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "segment names must not contain '/'".to_string(),
            });
        }
    }
    if !shm.state_name.is_empty() && shm.state_name == shm.sync_name {
        errors.push(ConfigValidationError::InvalidValue {
            field: "shm.sync_name".to_string(),
            reason: "must differ from shm.state_name".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_with_agents(count: usize) -> GridlockConfig {
        let mut config = GridlockConfig::default();
        config.processes.agents = (0..count)
            .map(|i| PathBuf::from(format!("./agent{}", i)))
            .collect();
        config
    }

    #[test]
    fn test_agent_count_bounds() {
        assert!(collect_errors(&config_with_agents(1)).is_empty());
        assert!(collect_errors(&config_with_agents(9)).is_empty());
        assert_eq!(
            collect_errors(&config_with_agents(0)),
            vec![ConfigValidationError::AgentCount { count: 0 }]
        );
        assert_eq!(
            collect_errors(&config_with_agents(10)),
            vec![ConfigValidationError::AgentCount { count: 10 }]
        );
    }

    #[test]
    fn test_board_capacity() {
        let mut config = config_with_agents(5);
        config.board.width = 2;
        config.board.height = 2;
        let errors = collect_errors(&config);
        assert!(errors.contains(&ConfigValidationError::BoardTooSmall {
            width: 2,
            height: 2,
            agents: 5
        }));
    }

    #[test]
    fn test_reward_range() {
        let mut config = config_with_agents(2);
        config.board.min_reward = 0;
        config.board.max_reward = -3;
        assert_eq!(collect_errors(&config).len(), 2);
    }

    #[test]
    fn test_segment_names() {
        let mut config = config_with_agents(2);
        config.shm.sync_name = config.shm.state_name.clone();
        assert_eq!(collect_errors(&config).len(), 1);

        config.shm.sync_name = "a/b".to_string();
        assert_eq!(collect_errors(&config).len(), 1);
    }

    #[test]
    fn test_error_message_lists_all_problems() {
        let mut config = config_with_agents(0);
        config.schedule.timeout_secs = 0;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("processes.agents"));
        assert!(err.contains("schedule.timeout_secs"));
    }
}
