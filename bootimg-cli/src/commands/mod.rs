//! One module per subcommand, each with an `execute` entry point

pub mod info;
pub mod repack_bootimg;
pub mod repack_updata;
pub mod unpack_bootimg;
pub mod unpack_updata;
