pub mod ast_util;
