pub mod base;
pub mod hashmap_dict;
