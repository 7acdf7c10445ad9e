mod yaml_parser;

pub use self::yaml_parser::load_yaml;
