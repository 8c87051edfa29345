pub mod yaml_keyword_store;

pub use yaml_keyword_store::YamlKeywordStore;
