//! Client-side configuration shared by requests.

pub mod execution_profile;
