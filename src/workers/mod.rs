pub mod accumulator;
pub mod file_writer;
pub mod simulated;

pub use accumulator::AccumulatorWorker;
pub use file_writer::FileWriterWorker;
pub use simulated::SimulatedSensorWorker;
