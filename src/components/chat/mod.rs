pub mod rt_manager;
