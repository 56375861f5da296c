mod config_info;
mod lists;
mod streams;
mod transactions;
