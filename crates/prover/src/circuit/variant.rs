use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::ProverError, parameters::VariantParameters, types::CircuitArtifacts, ProverResult,
};

/// Payment-notification templates the circuits are compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitVariant {
    VenmoSend,
    VenmoRegistration,
    HdfcSend,
    HdfcRegistration,
    PaylahSend,
    PaylahRegistration,
    WiseSend,
}

impl CircuitVariant {
    pub const ALL: [CircuitVariant; 7] = [
        CircuitVariant::VenmoSend,
        CircuitVariant::VenmoRegistration,
        CircuitVariant::HdfcSend,
        CircuitVariant::HdfcRegistration,
        CircuitVariant::PaylahSend,
        CircuitVariant::PaylahRegistration,
        CircuitVariant::WiseSend,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CircuitVariant::VenmoSend => "venmo_send",
            CircuitVariant::VenmoRegistration => "venmo_registration",
            CircuitVariant::HdfcSend => "hdfc_send",
            CircuitVariant::HdfcRegistration => "hdfc_registration",
            CircuitVariant::PaylahSend => "paylah_send",
            CircuitVariant::PaylahRegistration => "paylah_registration",
            CircuitVariant::WiseSend => "wise_send",
        }
    }

    pub fn parameters(&self) -> ProverResult<VariantParameters> {
        match self {
            CircuitVariant::WiseSend => Ok(VariantParameters {
                signing_domain: "wise.com".to_owned(),
                max_header_bytes: 3072,
                max_body_bytes: 30336,
                body_preselector: "#454745;\"> Hello ".to_owned(),
                sender_selector: "from:Wise <".to_owned(),
                timestamp_selector: "; d=wise.com; t=".to_owned(),
                amount_selector: "You received ".to_owned(),
                reference_code_selector: "28px;\">zkp2p-".to_owned(),
            }),
            other => Err(ProverError::UnsupportedVariant(other.name().to_owned())),
        }
    }

    /// Witness generator, proving key and verifying key under `build_dir`.
    pub fn artifacts<P: AsRef<Path>>(&self, build_dir: P) -> CircuitArtifacts {
        let build_dir = build_dir.as_ref();
        let name = self.name();
        CircuitArtifacts {
            wasm: build_dir
                .join(format!("{}_js", name))
                .join(format!("{}.wasm", name)),
            zkey: build_dir.join(format!("{}.zkey", name)),
            vkey: build_dir.join(format!("{}_vkey.json", name)),
        }
    }
}

impl fmt::Display for CircuitVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CircuitVariant {
    type Err = ProverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CircuitVariant::ALL
            .into_iter()
            .find(|variant| variant.name() == s)
            .ok_or_else(|| ProverError::UnsupportedVariant(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_wise_send_is_implemented() {
        for variant in CircuitVariant::ALL {
            let params = variant.parameters();
            if variant == CircuitVariant::WiseSend {
                params.unwrap().validate().unwrap();
            } else {
                assert!(matches!(params, Err(ProverError::UnsupportedVariant(_))));
            }
        }
    }

    #[test]
    fn parse_names() {
        assert_eq!(
            "wise_send".parse::<CircuitVariant>().unwrap(),
            CircuitVariant::WiseSend
        );
        assert_eq!(CircuitVariant::HdfcSend.to_string(), "hdfc_send");
        assert!("revolut_send".parse::<CircuitVariant>().is_err());
    }

    #[test]
    fn artifact_paths() {
        let artifacts = CircuitVariant::WiseSend.artifacts("build");
        assert_eq!(
            artifacts.wasm,
            Path::new("build/wise_send_js/wise_send.wasm")
        );
        assert_eq!(artifacts.zkey, Path::new("build/wise_send.zkey"));
        assert_eq!(artifacts.vkey, Path::new("build/wise_send_vkey.json"));
    }
}
