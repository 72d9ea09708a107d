pub use sdds_file::*;
pub use {
    sdds_comm as comm, sdds_dataset as dataset, sdds_dtype as dtype, sdds_error as error,
};
