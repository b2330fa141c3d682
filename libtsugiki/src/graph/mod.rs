pub mod lattice;
pub mod lattice_node;
pub mod path_record;
pub mod word_data;
