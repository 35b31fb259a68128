//! Device-access transport for AD936x transceivers.
//!
//! All hardware interaction goes through the [`Transport`] trait: attribute
//! reads/writes on named channels of the control device, string attributes on
//! the device itself, and blocking raw-buffer fetches from the receive path.
//! Control logic is written against the trait, so hardware revisions (and
//! tests) supply their own implementation.
//!
//! [`IioTransport`] is the libiio-backed implementation used with real
//! hardware (requires the `iio` feature).

use crate::error::Result;

/// Blocking access to one transceiver's attribute store and receive buffer.
///
/// Every call maps to a single synchronous hardware interaction; there are
/// no retries and no internal locking. A failed call leaves the device in
/// whatever state the hardware reached.
pub trait Transport {
    /// Read a string attribute from a named channel of the control device.
    fn read_str_attr(&self, channel: &str, attr: &str, output: bool) -> Result<String>;

    /// Write a string attribute on a named channel of the control device.
    fn write_str_attr(&mut self, channel: &str, attr: &str, output: bool, value: &str)
        -> Result<()>;

    /// Read an integer attribute from a named channel of the control device.
    fn read_int_attr(&self, channel: &str, attr: &str, output: bool) -> Result<i64>;

    /// Write an integer attribute on a named channel of the control device.
    fn write_int_attr(&mut self, channel: &str, attr: &str, output: bool, value: i64)
        -> Result<()>;

    /// Read a float attribute from a named channel of the control device.
    fn read_float_attr(&self, channel: &str, attr: &str, output: bool) -> Result<f64>;

    /// Write a float attribute on a named channel of the control device.
    fn write_float_attr(&mut self, channel: &str, attr: &str, output: bool, value: f64)
        -> Result<()>;

    /// Read a device-level string attribute of the control device.
    fn read_device_attr(&self, attr: &str) -> Result<String>;

    /// Write a device-level string attribute of the control device.
    fn write_device_attr(&mut self, attr: &str, value: &str) -> Result<()>;

    /// Fetch one refill's worth of interleaved real-valued samples from the
    /// receive path. Blocks until the hardware delivers a buffer.
    fn fetch_raw_buffer(&mut self) -> Result<Vec<f32>>;

    /// Number of complex channels whose data appears in a raw buffer.
    fn rx_channel_count(&self) -> usize;
}

#[cfg(feature = "iio")]
pub use iio_impl::IioTransport;

#[cfg(feature = "iio")]
mod iio_impl {
    use industrial_io as iio;
    use tracing::debug;

    use super::Transport;
    use crate::error::{Error, Result};
    use crate::{DEFAULT_RX_BUFFER_SIZE, PHY_DEVICE, RX_DATA_DEVICE};

    /// RX data channels of a 1R1T configuration: one I/Q pair.
    const DEFAULT_RX_CHANNELS: [&str; 2] = ["voltage0", "voltage1"];

    /// libiio-backed transport for AD936x devices.
    ///
    /// Holds the context, the `ad9361-phy` control device, the RX data
    /// device, and the enabled RX channels. The sample buffer is allocated
    /// on the first fetch so that attribute-only use never touches the
    /// streaming path.
    pub struct IioTransport {
        phy: iio::Device,
        rx_device: iio::Device,
        rx_channels: Vec<iio::Channel>,
        buffer: Option<iio::Buffer>,
        buffer_size: usize,
        _ctx: iio::Context,
    }

    impl IioTransport {
        /// Open a transport with the default 1R1T channel pair.
        ///
        /// An empty URI opens the default local context; otherwise the URI
        /// selects the backend (e.g. `"ip:192.168.2.1"`, `"usb:1.2.3"`).
        pub fn new(uri: &str) -> Result<Self> {
            Self::with_rx_channels(uri, &DEFAULT_RX_CHANNELS, DEFAULT_RX_BUFFER_SIZE)
        }

        /// Open a transport with explicit RX data channels and buffer size.
        ///
        /// The channel list holds the real components of each complex
        /// channel in I, Q order, so its length must be even.
        pub fn with_rx_channels(
            uri: &str,
            rx_channel_names: &[&str],
            buffer_size: usize,
        ) -> Result<Self> {
            if rx_channel_names.is_empty() || rx_channel_names.len() % 2 != 0 {
                return Err(Error::invalid_parameter(format!(
                    "RX channel list must hold I/Q pairs, got {} names",
                    rx_channel_names.len()
                )));
            }

            let ctx = if uri.is_empty() {
                iio::Context::new()?
            } else {
                iio::Context::with_backend(iio::Backend::Uri(uri))?
            };
            debug!("opened iio context ({} devices)", ctx.num_devices());

            let phy = ctx
                .find_device(PHY_DEVICE)
                .ok_or_else(|| Error::device(format!("no device named {}", PHY_DEVICE)))?;
            let rx_device = ctx
                .find_device(RX_DATA_DEVICE)
                .ok_or_else(|| Error::device(format!("no device named {}", RX_DATA_DEVICE)))?;

            let mut rx_channels = Vec::with_capacity(rx_channel_names.len());
            for name in rx_channel_names {
                let chan = rx_device.find_channel(name, false).ok_or_else(|| {
                    Error::device(format!("no channel {} on {}", name, RX_DATA_DEVICE))
                })?;
                chan.enable();
                rx_channels.push(chan);
            }
            debug!(
                "enabled {} RX channels on {}",
                rx_channels.len(),
                RX_DATA_DEVICE
            );

            Ok(Self {
                phy,
                rx_device,
                rx_channels,
                buffer: None,
                buffer_size,
                _ctx: ctx,
            })
        }

        fn channel(&self, name: &str, output: bool) -> Result<iio::Channel> {
            self.phy.find_channel(name, output).ok_or_else(|| {
                Error::device(format!(
                    "no {} channel {} on {}",
                    if output { "output" } else { "input" },
                    name,
                    PHY_DEVICE
                ))
            })
        }
    }

    impl Transport for IioTransport {
        fn read_str_attr(&self, channel: &str, attr: &str, output: bool) -> Result<String> {
            Ok(self.channel(channel, output)?.attr_read_str(attr)?)
        }

        fn write_str_attr(
            &mut self,
            channel: &str,
            attr: &str,
            output: bool,
            value: &str,
        ) -> Result<()> {
            Ok(self.channel(channel, output)?.attr_write_str(attr, value)?)
        }

        fn read_int_attr(&self, channel: &str, attr: &str, output: bool) -> Result<i64> {
            Ok(self.channel(channel, output)?.attr_read_int(attr)?)
        }

        fn write_int_attr(
            &mut self,
            channel: &str,
            attr: &str,
            output: bool,
            value: i64,
        ) -> Result<()> {
            Ok(self.channel(channel, output)?.attr_write_int(attr, value)?)
        }

        fn read_float_attr(&self, channel: &str, attr: &str, output: bool) -> Result<f64> {
            Ok(self.channel(channel, output)?.attr_read_float(attr)?)
        }

        fn write_float_attr(
            &mut self,
            channel: &str,
            attr: &str,
            output: bool,
            value: f64,
        ) -> Result<()> {
            Ok(self.channel(channel, output)?.attr_write_float(attr, value)?)
        }

        fn read_device_attr(&self, attr: &str) -> Result<String> {
            Ok(self.phy.attr_read_str(attr)?)
        }

        fn write_device_attr(&mut self, attr: &str, value: &str) -> Result<()> {
            Ok(self.phy.attr_write_str(attr, value)?)
        }

        fn fetch_raw_buffer(&mut self) -> Result<Vec<f32>> {
            if self.buffer.is_none() {
                debug!(
                    "allocating RX buffer of {} samples on {}",
                    self.buffer_size, RX_DATA_DEVICE
                );
                self.buffer = Some(self.rx_device.create_buffer(self.buffer_size, false)?);
            }
            let Some(buffer) = self.buffer.as_mut() else {
                return Err(Error::device("RX buffer unavailable"));
            };

            buffer.refill()?;

            let mut per_channel = Vec::with_capacity(self.rx_channels.len());
            for chan in &self.rx_channels {
                per_channel.push(chan.read::<i16>(buffer)?);
            }

            // Interleave frame-major: all channel components of frame 0,
            // then frame 1, and so on.
            let frames = per_channel.iter().map(Vec::len).min().unwrap_or(0);
            let mut raw = Vec::with_capacity(frames * per_channel.len());
            for frame in 0..frames {
                for samples in &per_channel {
                    raw.push(samples[frame] as f32);
                }
            }
            Ok(raw)
        }

        fn rx_channel_count(&self) -> usize {
            self.rx_channels.len() / 2
        }
    }
}
