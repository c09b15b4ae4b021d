pub mod result_sink;
