pub type CmdResult<T> = skiff::Result<(T, i32)>;

pub(crate) struct GlobalArgs {
    pub debug: bool,
}

pub mod deploy;
pub mod hosts;
pub mod prepare;
pub mod project;
pub mod service;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (skiff::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Prepare(args) => dispatch!(args, global, prepare),
        crate::Commands::Deploy(args) => dispatch!(args, global, deploy),
        crate::Commands::Service(args) => dispatch!(args, global, service),
        crate::Commands::Hosts(args) => dispatch!(args, global, hosts),
        crate::Commands::Project(args) => dispatch!(args, global, project),
    }
}
