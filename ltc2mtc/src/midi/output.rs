//! MIDI output port using midir

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// ALSA/CoreMIDI client name
pub const CLIENT_NAME: &str = "ltc2mtc";

/// Name of our own output port
pub const PORT_NAME: &str = "mtc_out";

/// Anything that can send raw MIDI bytes.
///
/// Implemented by [`MidiOutput`]; tests substitute a recorder.
pub trait MessageOutput: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Release the underlying port
    fn close(&mut self) {}
}

/// Connected MIDI output
pub struct MidiOutput {
    connection: Option<midir::MidiOutputConnection>,
    description: String,
}

impl MidiOutput {
    /// Names of the available MIDI output ports
    pub fn list_ports() -> Result<Vec<String>> {
        let output = new_client()?;
        let names: Vec<String> = output
            .ports()
            .iter()
            .filter_map(|port| output.port_name(port).ok())
            .collect();

        debug!("Found {} MIDI output ports", names.len());
        Ok(names)
    }

    /// Connect to the first port whose name contains `port`.
    ///
    /// Without a port name a virtual port `ltc2mtc:mtc_out` is created where
    /// the platform supports it, otherwise the first available port is used.
    pub fn connect(port: Option<&str>) -> Result<Self> {
        let output = new_client()?;

        match port {
            Some(wanted) => {
                let ports = output.ports();
                let found = ports.iter().find_map(|p| {
                    let name = output.port_name(p).ok()?;
                    name.contains(wanted).then(|| (p.clone(), name))
                });
                let (port, name) = found
                    .ok_or_else(|| Error::MidiOutput(format!("No MIDI output port matching '{}'", wanted)))?;

                let connection = output
                    .connect(&port, PORT_NAME)
                    .map_err(|e| Error::MidiOutput(format!("Failed to connect to '{}': {}", name, e)))?;
                info!("MTC output connected to MIDI port: {}", name);
                Ok(Self {
                    connection: Some(connection),
                    description: name,
                })
            }
            None => Self::connect_default(output),
        }
    }

    #[cfg(unix)]
    fn connect_default(output: midir::MidiOutput) -> Result<Self> {
        use midir::os::unix::VirtualOutput;

        let connection = output
            .create_virtual(PORT_NAME)
            .map_err(|e| Error::MidiOutput(format!("Failed to create virtual port: {}", e)))?;
        let description = format!("{}:{}", CLIENT_NAME, PORT_NAME);
        info!("MTC output on virtual MIDI port: {}", description);
        Ok(Self {
            connection: Some(connection),
            description,
        })
    }

    #[cfg(not(unix))]
    fn connect_default(output: midir::MidiOutput) -> Result<Self> {
        let ports = output.ports();
        let port = ports
            .first()
            .ok_or_else(|| Error::MidiOutput("No MIDI output ports available".to_string()))?;
        let name = output.port_name(port).unwrap_or_else(|_| "Unknown".to_string());

        let connection = output
            .connect(port, PORT_NAME)
            .map_err(|e| Error::MidiOutput(format!("Failed to connect to '{}': {}", name, e)))?;
        info!("MTC output connected to first MIDI port: {}", name);
        Ok(Self {
            connection: Some(connection),
            description: name,
        })
    }

    /// Port we are sending to
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl MessageOutput for MidiOutput {
    /// Close the connection. Safe to call more than once.
    fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!("MIDI output closed");
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::MidiOutput("Connection closed".to_string()))?;
        connection
            .send(bytes)
            .map_err(|e| Error::MidiOutput(format!("Send failed: {}", e)))
    }
}

impl Drop for MidiOutput {
    fn drop(&mut self) {
        if self.connection.is_some() {
            warn!("MIDI output dropped without close");
            self.close();
        }
    }
}

fn new_client() -> Result<midir::MidiOutput> {
    midir::MidiOutput::new(CLIENT_NAME)
        .map_err(|e| Error::MidiOutput(format!("Failed to initialize MIDI client: {}", e)))
}
