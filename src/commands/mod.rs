pub mod comments;
pub mod init;
pub mod issues;
pub mod projects;
pub mod roadmap;
pub mod serve;
pub mod teams;
