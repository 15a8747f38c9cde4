use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::{pymodule, Bound, PyResult};
use strato_core::config::AnalysisConfig;
use strato_core::python::to_py_err;

/// The default analysis configuration as a dict
#[pyfunction]
fn default_config(py: Python<'_>) -> PyResult<PyObject> {
    pythonize::pythonize(py, &AnalysisConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Check a configuration dict, returning it with every default filled in
#[pyfunction]
fn validate_config(py: Python<'_>, config: Bound<'_, PyAny>) -> PyResult<PyObject> {
    let config: AnalysisConfig = pythonize::depythonize_bound(config)
        .map_err(|e| PyValueError::new_err(format!("{}", e)))?;
    config.validate().map_err(to_py_err)?;
    pythonize::pythonize(py, &config).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
pub fn diagnostics(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(default_config, m)?)?;
    m.add_function(wrap_pyfunction!(validate_config, m)?)?;
    Ok(())
}
