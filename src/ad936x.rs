//! AD936x transceiver control.
//!
//! This module drives the baseband sample-rate path of an AD936x (the part
//! behind the ADALM-Pluto and friends): selecting and programming the
//! decimation/interpolation FIR, sequencing the attribute writes the
//! hardware needs around a rate change, and exposing the pass-through
//! gain/bandwidth/LO controls.
//!
//! All hardware access goes through a [`Transport`] implementation; with the
//! `iio` feature the [`Ad936xReader`] and [`AsyncAd936xReader`] wrap a
//! libiio-backed device into the usual sync/async sample sources.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::error::{Error, Result};
use crate::fir::FirProfile;
use crate::samples::{assemble_complex_samples, ComplexSampleSet};
use crate::transport::Transport;

/// Lowest baseband rate the sample-rate path supports, in samples/second.
pub const MIN_SAMPLE_RATE: i64 = 521_000;

/// Below this rate the FIR enable sequence needs the bootstrap dance.
const LOW_RATE_LIMIT: i64 = 25_000_000 / 12;

/// Rate the PLLs always accept; used to prime them around FIR toggles.
const FIR_SWITCH_RATE: i64 = 3_000_000;

const RX_CHANNEL: &str = "voltage0";
const RX_LO_CHANNEL: &str = "altvoltage0";
const TX_LO_CHANNEL: &str = "altvoltage1";
const FIR_ENABLE_CHANNEL: &str = "out";
const FIR_ENABLE_ATTR: &str = "voltage_filter_fir_en";
const SAMPLING_FREQUENCY_ATTR: &str = "sampling_frequency";
const HARDWARE_GAIN_ATTR: &str = "hardwaregain";
const RF_BANDWIDTH_ATTR: &str = "rf_bandwidth";
const LO_FREQUENCY_ATTR: &str = "frequency";
const GAIN_CONTROL_MODE_ATTR: &str = "gain_control_mode";
const FIR_CONFIG_ATTR: &str = "filter_fir_config";
const TX_PATH_RATES_ATTR: &str = "tx_path_rates";

/// Receive-path AGC mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GainControlMode {
    /// Gain fixed to the value written via the RX hardware gain.
    Manual,
    /// Automatic gain control with slow attack.
    SlowAttack,
    /// Automatic gain control with fast attack.
    FastAttack,
}

impl GainControlMode {
    /// The attribute string the hardware uses for this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            GainControlMode::Manual => "manual",
            GainControlMode::SlowAttack => "slow_attack",
            GainControlMode::FastAttack => "fast_attack",
        }
    }
}

impl fmt::Display for GainControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GainControlMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "manual" => Ok(GainControlMode::Manual),
            "slow_attack" => Ok(GainControlMode::SlowAttack),
            "fast_attack" => Ok(GainControlMode::FastAttack),
            other => Err(Error::data(format!("unknown gain control mode {:?}", other))),
        }
    }
}

/// An AD936x transceiver driven through a [`Transport`].
///
/// The instance assumes single-owner, single-threaded access to one device;
/// callers that share it across threads must serialize whole operations
/// externally, since a rate change racing a buffer read could observe a torn
/// configuration.
pub struct Ad936x<T: Transport> {
    transport: T,
}

impl<T: Transport> Ad936x<T> {
    /// Wrap a transport. Channel initialization is the transport's concern
    /// and is assumed to have happened already.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Consume the device and hand the transport back.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Current committed sample rate of the RX and TX paths.
    pub fn sample_rate(&self) -> Result<i64> {
        self.transport
            .read_int_attr(RX_CHANNEL, SAMPLING_FREQUENCY_ATTR, false)
    }

    /// Change the sample rate of both paths, reprogramming the baseband FIR.
    ///
    /// Selects the FIR profile for the requested rate, pushes its
    /// configuration to the device, and commits the rate with the enable
    /// sequencing the hardware requires: the FIR is dropped before the
    /// table swap (priming the PLLs at a safe rate first when the current
    /// rate is too low to validate the transition), and at narrowband rates
    /// the DAC/TX clock ratio is checked against the tap count before the
    /// filter is re-enabled.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameter`] for rates below [`MIN_SAMPLE_RATE`];
    ///   nothing is written to the device.
    /// - [`Error::DeviceCommunication`] if any attribute access fails. The
    ///   sequence is aborted at the failing write and the device may be
    ///   left partially configured; re-query its state before retrying.
    /// - [`Error::DataIntegrity`] if the `tx_path_rates` readback cannot
    ///   be parsed.
    pub fn set_sample_rate(&mut self, rate: i64) -> Result<()> {
        if rate < MIN_SAMPLE_RATE {
            return Err(Error::invalid_parameter(format!(
                "sample rate {} Hz is below the {} Hz floor",
                rate, MIN_SAMPLE_RATE
            )));
        }

        let profile = FirProfile::for_rate(rate);
        debug!(
            "rate change to {} S/s: dec {}, {} taps",
            rate,
            profile.decimation,
            profile.tap_count()
        );

        let current_rate = self.sample_rate()?;

        if self
            .transport
            .read_int_attr(FIR_ENABLE_CHANNEL, FIR_ENABLE_ATTR, false)?
            != 0
        {
            // The filter cannot be torn down atomically with a low rate in
            // effect; prime the clocks first.
            if current_rate <= LOW_RATE_LIMIT {
                debug!("priming sampling frequency at {} Hz", FIR_SWITCH_RATE);
                self.transport.write_int_attr(
                    RX_CHANNEL,
                    SAMPLING_FREQUENCY_ATTR,
                    false,
                    FIR_SWITCH_RATE,
                )?;
            }
            self.transport
                .write_int_attr(FIR_ENABLE_CHANNEL, FIR_ENABLE_ATTR, false, 0)?;
        }

        self.transport
            .write_device_attr(FIR_CONFIG_ATTR, &profile.config_payload())?;

        if rate <= LOW_RATE_LIMIT {
            let readback = self.transport.read_device_attr(TX_PATH_RATES_ATTR)?;
            let (dac_rate, tx_rate) = parse_tx_path_rates(&readback)?;
            let max_taps = (dac_rate / tx_rate) * 16;
            if max_taps < profile.tap_count() as i64 {
                debug!(
                    "DAC/TX ratio supports {} taps, priming at {} Hz",
                    max_taps, FIR_SWITCH_RATE
                );
                self.transport.write_int_attr(
                    RX_CHANNEL,
                    SAMPLING_FREQUENCY_ATTR,
                    false,
                    FIR_SWITCH_RATE,
                )?;
            }
            self.transport
                .write_int_attr(FIR_ENABLE_CHANNEL, FIR_ENABLE_ATTR, false, 1)?;
            self.transport
                .write_int_attr(RX_CHANNEL, SAMPLING_FREQUENCY_ATTR, false, rate)?;
        } else {
            self.transport
                .write_int_attr(RX_CHANNEL, SAMPLING_FREQUENCY_ATTR, false, rate)?;
            self.transport
                .write_int_attr(FIR_ENABLE_CHANNEL, FIR_ENABLE_ATTR, false, 1)?;
        }
        Ok(())
    }

    /// Fetch one buffer from the receive path and assemble it into complex
    /// samples, one sequence per configured channel.
    pub fn receive(&mut self) -> Result<ComplexSampleSet> {
        let raw = self.transport.fetch_raw_buffer()?;
        let channels = self.transport.rx_channel_count();
        assemble_complex_samples(&raw, channels)
    }

    /// Mode of the receive-path AGC.
    pub fn gain_control_mode(&self) -> Result<GainControlMode> {
        self.transport
            .read_str_attr(RX_CHANNEL, GAIN_CONTROL_MODE_ATTR, false)?
            .trim()
            .parse()
    }

    /// Set the mode of the receive-path AGC.
    pub fn set_gain_control_mode(&mut self, mode: GainControlMode) -> Result<()> {
        self.transport
            .write_str_attr(RX_CHANNEL, GAIN_CONTROL_MODE_ATTR, false, mode.as_str())
    }

    /// Gain applied to the RX path, in dB.
    pub fn rx_hardware_gain(&self) -> Result<f64> {
        self.transport
            .read_float_attr(RX_CHANNEL, HARDWARE_GAIN_ATTR, false)
    }

    /// Set the RX path gain, in dB. Only applicable with the AGC in manual
    /// mode; in any other mode the write is rejected so the caller knows
    /// the gain was not applied.
    pub fn set_rx_hardware_gain(&mut self, gain: f64) -> Result<()> {
        if self.gain_control_mode()? != GainControlMode::Manual {
            return Err(Error::invalid_parameter(
                "RX hardware gain is only adjustable in manual gain control mode",
            ));
        }
        self.transport
            .write_float_attr(RX_CHANNEL, HARDWARE_GAIN_ATTR, false, gain)
    }

    /// Attenuation applied to the TX path, in dB.
    pub fn tx_hardware_gain(&self) -> Result<f64> {
        self.transport
            .read_float_attr(RX_CHANNEL, HARDWARE_GAIN_ATTR, true)
    }

    /// Set the TX path attenuation, in dB.
    pub fn set_tx_hardware_gain(&mut self, gain: f64) -> Result<()> {
        self.transport
            .write_float_attr(RX_CHANNEL, HARDWARE_GAIN_ATTR, true, gain)
    }

    /// Bandwidth of the RX front-end analog filter, in Hz.
    pub fn rx_rf_bandwidth(&self) -> Result<i64> {
        self.transport
            .read_int_attr(RX_CHANNEL, RF_BANDWIDTH_ATTR, false)
    }

    /// Set the bandwidth of the RX front-end analog filter, in Hz.
    pub fn set_rx_rf_bandwidth(&mut self, bandwidth: i64) -> Result<()> {
        self.transport
            .write_int_attr(RX_CHANNEL, RF_BANDWIDTH_ATTR, false, bandwidth)
    }

    /// Bandwidth of the TX front-end analog filter, in Hz.
    pub fn tx_rf_bandwidth(&self) -> Result<i64> {
        self.transport
            .read_int_attr(RX_CHANNEL, RF_BANDWIDTH_ATTR, true)
    }

    /// Set the bandwidth of the TX front-end analog filter, in Hz.
    pub fn set_tx_rf_bandwidth(&mut self, bandwidth: i64) -> Result<()> {
        self.transport
            .write_int_attr(RX_CHANNEL, RF_BANDWIDTH_ATTR, true, bandwidth)
    }

    /// Carrier frequency of the RX path, in Hz.
    pub fn rx_lo(&self) -> Result<i64> {
        self.transport
            .read_int_attr(RX_LO_CHANNEL, LO_FREQUENCY_ATTR, true)
    }

    /// Set the carrier frequency of the RX path, in Hz.
    pub fn set_rx_lo(&mut self, frequency: i64) -> Result<()> {
        self.transport
            .write_int_attr(RX_LO_CHANNEL, LO_FREQUENCY_ATTR, true, frequency)
    }

    /// Carrier frequency of the TX path, in Hz.
    pub fn tx_lo(&self) -> Result<i64> {
        self.transport
            .read_int_attr(TX_LO_CHANNEL, LO_FREQUENCY_ATTR, true)
    }

    /// Set the carrier frequency of the TX path, in Hz.
    pub fn set_tx_lo(&mut self, frequency: i64) -> Result<()> {
        self.transport
            .write_int_attr(TX_LO_CHANNEL, LO_FREQUENCY_ATTR, true, frequency)
    }
}

/// Parse the `DAC:` and `TXSAMP:` tokens out of a `tx_path_rates` readback.
///
/// The readback is a space-separated list of `label:value` tokens, e.g.
/// `BBPLL:983040000 DAC:122880000 T2:122880000 T1:61440000 TF:30720000
/// TXSAMP:30720000`.
fn parse_tx_path_rates(readback: &str) -> Result<(i64, i64)> {
    let mut dac_rate = None;
    let mut tx_rate = None;
    for token in readback.split_whitespace() {
        if let Some(value) = token.strip_prefix("DAC:") {
            dac_rate = Some(parse_rate_token("DAC", value)?);
        } else if let Some(value) = token.strip_prefix("TXSAMP:") {
            tx_rate = Some(parse_rate_token("TXSAMP", value)?);
        }
    }
    match (dac_rate, tx_rate) {
        (Some(dac), Some(tx)) if tx > 0 => Ok((dac, tx)),
        (Some(_), Some(_)) => Err(Error::data(format!(
            "tx_path_rates reports a zero TXSAMP rate: {:?}",
            readback
        ))),
        _ => Err(Error::data(format!(
            "tx_path_rates readback is missing DAC or TXSAMP: {:?}",
            readback
        ))),
    }
}

fn parse_rate_token(label: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|_| Error::data(format!("bad {} rate in tx_path_rates: {:?}", label, value)))
}

#[cfg(feature = "iio")]
pub use reader::{Ad936xConfig, Ad936xReader, AsyncAd936xReader};

#[cfg(feature = "iio")]
mod reader {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use futures::Stream;
    use tokio::sync::mpsc;

    use super::{Ad936x, GainControlMode};
    use crate::error::Result;
    use crate::samples::ComplexSampleSet;
    use crate::transport::IioTransport;

    /**
     * AD936x receiver configuration
     */
    #[derive(Debug, Clone)]
    pub struct Ad936xConfig {
        /// Device URI (e.g. "ip:192.168.2.1" or "usb:1.2.3"); empty for the
        /// default local context
        pub uri: String,
        /// Sample rate in Hz
        pub sample_rate: i64,
        /// RX carrier frequency in Hz
        pub rx_lo: i64,
        /// Receive-path AGC mode
        pub gain_control_mode: GainControlMode,
    }

    impl Ad936xConfig {
        /// Create a configuration with the slow-attack AGC default.
        pub fn new(uri: String, sample_rate: i64, rx_lo: i64) -> Self {
            Self {
                uri,
                sample_rate,
                rx_lo,
                gain_control_mode: GainControlMode::SlowAttack,
            }
        }
    }

    /**
     * Synchronous AD936x I/Q Reader
     */
    pub struct Ad936xReader {
        device: Ad936x<IioTransport>,
    }

    impl Ad936xReader {
        /// Open the device behind `config.uri` and apply the configuration.
        pub fn new(config: &Ad936xConfig) -> Result<Self> {
            let transport = IioTransport::new(&config.uri)?;
            let mut device = Ad936x::new(transport);
            device.set_sample_rate(config.sample_rate)?;
            device.set_rx_lo(config.rx_lo)?;
            device.set_gain_control_mode(config.gain_control_mode)?;
            Ok(Self { device })
        }

        /// Access the underlying device, e.g. for gain or LO adjustments
        /// between reads.
        pub fn device_mut(&mut self) -> &mut Ad936x<IioTransport> {
            &mut self.device
        }
    }

    impl Iterator for Ad936xReader {
        type Item = Result<ComplexSampleSet>;

        fn next(&mut self) -> Option<Self::Item> {
            Some(self.device.receive())
        }
    }

    /**
     * Asynchronous AD936x I/Q Stream
     */
    pub struct AsyncAd936xReader {
        receiver: mpsc::Receiver<Result<ComplexSampleSet>>,
        _handle: tokio::task::JoinHandle<()>,
    }

    impl AsyncAd936xReader {
        /// Open the device on a dedicated blocking task and stream its
        /// buffers. All device access stays on that one task, preserving
        /// the single-owner contract.
        pub async fn new(config: &Ad936xConfig) -> Result<Self> {
            let config = config.clone();
            let (tx, rx) = mpsc::channel::<Result<ComplexSampleSet>>(32);

            let handle = tokio::task::spawn_blocking(move || {
                let mut reader = match Ad936xReader::new(&config) {
                    Ok(reader) => reader,
                    Err(e) => {
                        let _ = tx.blocking_send(Err(e));
                        return;
                    }
                };
                loop {
                    let item = reader.device.receive();
                    let failed = item.is_err();
                    if tx.blocking_send(item).is_err() || failed {
                        break;
                    }
                }
            });

            Ok(Self {
                receiver: rx,
                _handle: handle,
            })
        }
    }

    impl Stream for AsyncAd936xReader {
        type Item = Result<ComplexSampleSet>;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            self.receiver.poll_recv(cx)
        }
    }
}
