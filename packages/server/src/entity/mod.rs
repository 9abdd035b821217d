pub mod compression_record;
