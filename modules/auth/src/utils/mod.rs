pub mod init_data;
pub mod jwt;
pub mod password;
pub mod secret;
