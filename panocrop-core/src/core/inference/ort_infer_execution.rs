use super::*;
use ndarray::{Array2, Array4};
use ort::session::SessionInputValue;
use ort::value::TensorRef;

/// Raw `f32` output tensor: shape and row-major data.
#[derive(Debug, Clone)]
pub struct RawTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl RawTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> CropResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(CropError::validation_error(
                "RawTensor",
                "data",
                &format!("{} elements for shape {:?}", expected, shape),
                &data.len().to_string(),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Splits a `[batch, dim]` tensor into one vector per batch row.
    pub fn into_rows(self) -> CropResult<Vec<Vec<f32>>> {
        match self.shape.as_slice() {
            [_, dim] if *dim > 0 => Ok(self.data.chunks(*dim).map(<[f32]>::to_vec).collect()),
            other => Err(CropError::validation_error(
                "RawTensor",
                "shape",
                "[batch, dim]",
                &format!("{:?}", other),
            )),
        }
    }
}

impl OrtInfer {
    /// Name of the first graph input.
    pub fn input_name(&self) -> CropResult<String> {
        self.with_session(|session| {
            session
                .inputs
                .first()
                .map(|input| input.name.clone())
                .ok_or_else(|| {
                    CropError::invalid_input(format!(
                        "model '{}' declares no inputs",
                        self.model_name
                    ))
                })
        })
    }

    /// Name of `preferred` if the graph declares such an output, otherwise the name of
    /// the first output.
    pub fn output_name(&self, preferred: Option<&str>) -> CropResult<String> {
        self.with_session(|session| {
            if let Some(name) = preferred.filter(|n| session.outputs.iter().any(|o| o.name == *n)) {
                return Ok(name.to_string());
            }
            session
                .outputs
                .first()
                .map(|output| output.name.clone())
                .ok_or_else(|| {
                    CropError::invalid_input(format!(
                        "model '{}' declares no outputs - the file may be corrupted",
                        self.model_name
                    ))
                })
        })
    }

    /// Feeds a single NCHW image tensor to the model and returns its first output.
    pub fn infer_4d(&self, x: &Array4<f32>) -> CropResult<RawTensor> {
        self.infer_4d_output(x, None)
    }

    /// Like [`OrtInfer::infer_4d`], returning the output named `preferred` when the
    /// graph has one.
    pub fn infer_4d_output(&self, x: &Array4<f32>, preferred: Option<&str>) -> CropResult<RawTensor> {
        let input_name = self.input_name()?;
        let output_name = self.output_name(preferred)?;
        let input_shape = x.shape().to_vec();

        self.with_session(|session| {
            let tensor = TensorRef::from_array_view(x.view()).map_err(|e| {
                CropError::inference_error(
                    &self.model_name,
                    &format!("failed to convert input tensor with shape {:?}", input_shape),
                    e,
                )
            })?;

            let outputs = session
                .run(ort::inputs![input_name.as_str() => tensor])
                .map_err(|e| {
                    CropError::inference_error(
                        &self.model_name,
                        &format!(
                            "forward pass failed for input '{}' -> output '{}'",
                            input_name, output_name
                        ),
                        e,
                    )
                })?;

            extract_f32(&self.model_name, &outputs, &output_name)
        })
    }

    /// Runs a text model on `[batch, seq]` token tensors.
    ///
    /// Only the named inputs the graph actually declares are fed, so one call site
    /// serves models with and without e.g. `token_type_ids`.
    pub fn infer_tokens(
        &self,
        inputs: &[(&str, Array2<i64>)],
        preferred_output: Option<&str>,
    ) -> CropResult<RawTensor> {
        let output_name = self.output_name(preferred_output)?;

        self.with_session(|session| {
            let declared: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
            let mut values: Vec<(String, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
            for (name, array) in inputs {
                if !declared.iter().any(|d| d == name) {
                    continue;
                }
                let tensor = TensorRef::from_array_view(array.view()).map_err(|e| {
                    CropError::inference_error(
                        &self.model_name,
                        &format!("failed to convert token input '{}'", name),
                        e,
                    )
                })?;
                values.push((name.to_string(), tensor.into()));
            }
            if values.is_empty() {
                return Err(CropError::invalid_input(format!(
                    "model '{}' accepts none of the token inputs, it declares {:?}",
                    self.model_name, declared
                )));
            }

            let outputs = session.run(values).map_err(|e| {
                CropError::inference_error(
                    &self.model_name,
                    &format!("forward pass failed for output '{}'", output_name),
                    e,
                )
            })?;

            extract_f32(&self.model_name, &outputs, &output_name)
        })
    }
}

fn extract_f32(
    model_name: &str,
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
) -> CropResult<RawTensor> {
    let (shape, data) = outputs[output_name]
        .try_extract_tensor::<f32>()
        .map_err(|e| {
            CropError::inference_error(
                model_name,
                &format!("failed to extract output tensor '{}' as f32", output_name),
                e,
            )
        })?;
    let shape = shape.iter().map(|&d| d.max(0) as usize).collect();
    RawTensor::new(shape, data.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_load_error() {
        let err = OrtInfer::new("/nonexistent/model.onnx").unwrap_err();
        assert!(matches!(err, CropError::ModelLoad { .. }));
    }

    #[test]
    fn test_raw_tensor_checks_length() {
        assert!(RawTensor::new(vec![1, 2, 3], vec![0.0; 6]).is_ok());
        assert!(RawTensor::new(vec![1, 2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_into_rows() -> CropResult<()> {
        let rows = RawTensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?.into_rows()?;
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert!(RawTensor::new(vec![6], vec![0.0; 6])?.into_rows().is_err());
        Ok(())
    }
}
