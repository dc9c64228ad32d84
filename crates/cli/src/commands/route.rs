use clap::ValueEnum;
use serde::Serialize;

use rapport_core::routing::{ModelRoute, TaskComplexity, TaskRouter, TaskType};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CliTask {
    PatternDetection,
    EntityExtraction,
    StageDetection,
    ActionGeneration,
    ReplyGeneration,
}

impl From<CliTask> for TaskType {
    fn from(task: CliTask) -> Self {
        match task {
            CliTask::PatternDetection => TaskType::PatternDetection,
            CliTask::EntityExtraction => TaskType::EntityExtraction,
            CliTask::StageDetection => TaskType::StageDetection,
            CliTask::ActionGeneration => TaskType::ActionGeneration,
            CliTask::ReplyGeneration => TaskType::ReplyGeneration,
        }
    }
}

#[derive(Debug, Serialize)]
struct RouteReport {
    task: TaskType,
    complexity: TaskComplexity,
    route: ModelRoute,
}

pub fn run(task: CliTask, text: &str) -> CommandResult {
    let router = TaskRouter::new();
    let task_type = TaskType::from(task);

    let report = RouteReport {
        task: task_type,
        complexity: router.assess_complexity(task_type, text),
        route: router.route(task_type, text),
    };

    CommandResult::success("route", report)
}

#[cfg(test)]
mod tests {
    use super::{run, CliTask};

    #[test]
    fn route_report_includes_tier_and_cost() {
        let result = run(CliTask::ReplyGeneration, "short note");
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("\"tier\": \"full\""));
        assert!(result.output.contains("estimated_cost"));
    }

    #[test]
    fn strong_phrasing_routes_pattern_detection_rule_based() {
        let result = run(CliTask::PatternDetection, "ready to buy ASAP");
        assert!(result.output.contains("\"tier\": \"rule-based\""));
    }
}
