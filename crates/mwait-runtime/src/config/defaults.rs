//! Compile-time defaults, merged by build.rs from library defaults and the
//! optional `MW_CONFIG_RS` user file.

include!(concat!(env!("OUT_DIR"), "/mw_merged_config.rs"));
