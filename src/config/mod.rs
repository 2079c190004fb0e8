//! Configuration sources other than the command line.

pub mod wp_config;

pub use wp_config::{
    read_wp_config, rewrite_table_prefix, switch_table_prefix, write_table_prefix, WpConfig,
};
