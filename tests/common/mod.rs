pub(crate) mod counter_app;

pub(crate) mod logging;

pub(crate) mod mem_db;

pub(crate) mod node;
