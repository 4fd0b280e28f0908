#![forbid(unsafe_code)]

//! Wire format for the CMT secure payload envelope.
//!
//! The envelope is a protobuf message so that every field is tagged and
//! length-delimited; the counterparty bridge parses the same schema:
//!
//! ```text
//! message CmtEnvelopeV1 {
//!   uint32             version       = 1;
//!   KeyWrapAlgorithmV1 key_wrap      = 2;
//!   CipherSuiteV1      cipher        = 3;
//!   bytes              encrypted_key = 4;
//!   bytes              nonce         = 5;
//!   bytes              ciphertext    = 6;
//! }
//! ```
//!
//! The message types are written out with `prost` derives instead of being
//! generated at build time, so the crate builds without `protoc`.

pub mod validation;

#[cfg(test)]
mod proptests;

pub mod v1 {
    //! Version 1 of the envelope schema.

    /// Current envelope version.
    pub const ENVELOPE_VERSION: u32 = 1;

    /// Asymmetric algorithm used to wrap the per-message symmetric key.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum KeyWrapAlgorithmV1 {
        Unspecified = 0,
        /// RSA with OAEP padding, SHA-256 digest and SHA-256 MGF1.
        RsaOaepSha256 = 1,
    }

    /// Symmetric cipher used for the payload.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum CipherSuiteV1 {
        Unspecified = 0,
        /// AES-256-GCM with a 96-bit nonce and 128-bit tag.
        Aes256Gcm = 1,
    }

    impl KeyWrapAlgorithmV1 {
        /// Stable name used in log fields.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Unspecified => "KEY_WRAP_UNSPECIFIED",
                Self::RsaOaepSha256 => "RSA_OAEP_SHA256",
            }
        }
    }

    impl CipherSuiteV1 {
        /// Stable name used in log fields.
        pub fn as_str_name(&self) -> &'static str {
            match self {
                Self::Unspecified => "CIPHER_UNSPECIFIED",
                Self::Aes256Gcm => "AES_256_GCM",
            }
        }
    }

    /// Self-contained hybrid encryption envelope.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct CmtEnvelopeV1 {
        #[prost(uint32, tag = "1")]
        pub version: u32,
        #[prost(enumeration = "KeyWrapAlgorithmV1", tag = "2")]
        pub key_wrap: i32,
        #[prost(enumeration = "CipherSuiteV1", tag = "3")]
        pub cipher: i32,
        /// Symmetric key encrypted under the recipient's public key.
        #[prost(bytes = "vec", tag = "4")]
        pub encrypted_key: ::prost::alloc::vec::Vec<u8>,
        #[prost(bytes = "vec", tag = "5")]
        pub nonce: ::prost::alloc::vec::Vec<u8>,
        /// Authenticated ciphertext with the tag appended.
        #[prost(bytes = "vec", tag = "6")]
        pub ciphertext: ::prost::alloc::vec::Vec<u8>,
    }
}
