pub mod settings;
pub mod token_list;
