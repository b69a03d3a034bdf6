mod assignments;
mod common;
mod poller;
