use std::{fs::File, io, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::ProverError, sha256::BLOCK_BYTES, ProverResult};

/// Capacities and selector literals of one circuit variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantParameters {
    pub signing_domain: String,
    pub max_header_bytes: usize,
    pub max_body_bytes: usize,
    /// anchors the sha precompute cutoff inside the body
    pub body_preselector: String,
    pub sender_selector: String,
    pub timestamp_selector: String,
    pub amount_selector: String,
    pub reference_code_selector: String,
}

impl VariantParameters {
    pub fn validate(&self) -> ProverResult<()> {
        for (name, capacity) in [
            ("maxHeaderBytes", self.max_header_bytes),
            ("maxBodyBytes", self.max_body_bytes),
        ] {
            if capacity == 0 || capacity % BLOCK_BYTES != 0 {
                return Err(ProverError::InvalidLength(format!(
                    "{} = {} is not a positive multiple of {}",
                    name, capacity, BLOCK_BYTES
                )));
            }
        }

        for (name, selector) in [
            ("signingDomain", &self.signing_domain),
            ("bodyPreselector", &self.body_preselector),
            ("senderSelector", &self.sender_selector),
            ("timestampSelector", &self.timestamp_selector),
            ("amountSelector", &self.amount_selector),
            ("referenceCodeSelector", &self.reference_code_selector),
        ] {
            if selector.is_empty() {
                return Err(ProverError::SpecificError(format!("{} is empty", name)));
            }
        }

        Ok(())
    }
}

pub fn load_variant_parameters<P: AsRef<Path>>(p: P) -> ProverResult<VariantParameters> {
    let file = File::open(p)?;
    let file = io::BufReader::new(file);
    let params: VariantParameters = serde_json::from_reader(file)?;
    params.validate()?;

    return Ok(params);
}

pub fn store_variant_parameters<P: AsRef<Path>>(
    params: &VariantParameters,
    p: P,
) -> ProverResult<()> {
    let buffer = File::create(p)?;
    let buffer = io::BufWriter::new(buffer);
    serde_json::to_writer_pretty(buffer, params)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::variant::CircuitVariant;

    #[test]
    fn store_and_load() {
        let params = CircuitVariant::WiseSend.parameters().unwrap();
        let path = std::env::temp_dir().join(format!(
            "wise_send_params_{}.json",
            std::process::id()
        ));

        store_variant_parameters(&params, &path).unwrap();
        let loaded = load_variant_parameters(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded, params);
    }

    #[test]
    fn misaligned_capacity_rejected() {
        let mut params = CircuitVariant::WiseSend.parameters().unwrap();
        params.max_body_bytes = 30312;
        assert!(matches!(
            params.validate(),
            Err(ProverError::InvalidLength(_))
        ));

        let mut params = CircuitVariant::WiseSend.parameters().unwrap();
        params.amount_selector.clear();
        assert!(params.validate().is_err());
    }

    #[test]
    fn camel_case_json() {
        let json = serde_json::to_value(CircuitVariant::WiseSend.parameters().unwrap()).unwrap();
        assert_eq!(json["signingDomain"], "wise.com");
        assert_eq!(json["timestampSelector"], "; d=wise.com; t=");
    }
}
