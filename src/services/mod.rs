// GitBrowser archive services
// Services hold the archiving logic: eligibility policy, duplicate tracking, the archival engine, settings.

pub mod archival_engine;
pub mod clock;
pub mod duplicate_tracker;
pub mod eligibility_policy;
pub mod settings_engine;
pub mod tab_state;
pub mod task_queue;
