//! Baseband sample-rate and FIR filter control for AD936x-based SDRs.
//!
//! # Overview
//!
//! `rs-pluto` drives the sample-rate path of an AD936x transceiver (the part
//! inside the ADALM-Pluto and many other SDRs): it selects the right
//! decimation/interpolation FIR kernel for a requested rate, programs it
//! into the device with the attribute-write sequencing the hardware
//! requires, and assembles raw receive buffers back into complex I/Q
//! samples.
//!
//! Hardware access is abstracted behind the [`Transport`] trait; the
//! libiio-backed [`IioTransport`] (feature `iio`) talks to real devices,
//! while tests and simulations can supply their own implementation.
//!
//! # Example
//!
//! Requires the `iio` feature:
//!
//! ```ignore
//! use rs_pluto::{Ad936x, IioTransport};
//!
//! let transport = IioTransport::new("ip:192.168.2.1")?;
//! let mut sdr = Ad936x::new(transport);
//! sdr.set_sample_rate(2_000_000)?;
//! sdr.set_rx_lo(433_920_000)?;
//! let samples = sdr.receive()?;
//! println!("got {} samples", samples.len());
//! ```

pub mod ad936x;
pub mod error;
pub mod fir;
pub mod samples;
pub mod transport;

pub use ad936x::{Ad936x, GainControlMode, MIN_SAMPLE_RATE};
pub use error::{Error, Result};
pub use fir::FirProfile;
pub use samples::{assemble_complex_samples, ComplexSampleSet};
pub use transport::Transport;

#[cfg(feature = "iio")]
pub use ad936x::{Ad936xConfig, Ad936xReader, AsyncAd936xReader};
#[cfg(feature = "iio")]
pub use transport::IioTransport;

// AD936x device names as exposed by the kernel driver.
pub const PHY_DEVICE: &str = "ad9361-phy";
pub const RX_DATA_DEVICE: &str = "cf-ad9361-lpc";
pub const TX_DATA_DEVICE: &str = "cf-ad9361-dds-core-lpc";

/// Default receive buffer size in samples per channel.
pub const DEFAULT_RX_BUFFER_SIZE: usize = 1024;
