pub(crate) mod client;
pub(crate) mod list;
pub(crate) mod meta;
pub(crate) mod run;
