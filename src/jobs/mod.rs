mod monitor;

pub(crate) use monitor::start_monitor_job;
