//! RS-485 bus tasks.
//!
//! The bus is half-duplex and shared by every node plus the host. USART2
//! runs in interrupt-buffered mode: the USART interrupt only moves bytes
//! between the peripheral and two ring buffers, and the tasks below do the
//! protocol work in thread mode.
//!
//! - [`bus_rx_task`] feeds every received byte to the frame receiver
//!   through the [`BusPort`], which stores song data, posts controls
//!   and acknowledgements.
//! - [`bus_tx_task`] drains queued responses, turning the transceiver
//!   around once per burst. The transceiver's receiver is disabled while
//!   driving, so a node never hears its own responses.

#[cfg(feature = "debug-mode")]
use defmt::debug;
use defmt::{info, warn};
use embassy_stm32::gpio::Output;
use embassy_stm32::usart::{self, BufferedUartRx, BufferedUartTx};
use embedded_io_async::{Read, Write};
use musicbox_core::{BusPort, FrameEvent, ResponsePort};

use crate::config::{BUS_RX_CHUNK_LEN, BUS_TX_BATCH_LEN};

/// Async task that receives and parses bus traffic.
///
/// UART errors (framing, noise, overrun) mean bytes were lost, so the
/// frame in flight is abandoned and the next byte is read as a header.
#[embassy_executor::task]
pub async fn bus_rx_task(mut rx: BufferedUartRx<'static>, mut port: BusPort<'static>) {
    let mut chunk = [0u8; BUS_RX_CHUNK_LEN];
    loop {
        match rx.read(&mut chunk).await {
            Ok(len) => {
                for &byte in &chunk[..len] {
                    if let Some(event) = port.on_byte(byte) {
                        log_frame_event(event);
                    }
                }
            }
            Err(e) => {
                if port.resync() {
                    warn!("Bus receive error: {}, dropped partial frame", e);
                } else {
                    warn!("Bus receive error: {}", e);
                }
            }
        }
    }
}

/// Async task that transmits queued responses.
///
/// # Arguments
///
/// * `tx` - Transmit half of the bus UART
/// * `driver_enable` - Transceiver direction pin (high = drive the bus)
/// * `responses` - Response queue filled by the receive task and main loop
#[embassy_executor::task]
pub async fn bus_tx_task(
    mut tx: BufferedUartTx<'static>,
    mut driver_enable: Output<'static>,
    responses: ResponsePort<'static>,
) {
    let mut batch = [0u8; BUS_TX_BATCH_LEN];
    loop {
        batch[0] = responses.next().await.into();
        let mut len = 1;
        while len < batch.len() {
            match responses.try_next() {
                Some(response) => {
                    batch[len] = response.into();
                    len += 1;
                }
                None => break,
            }
        }

        driver_enable.set_high();
        let result = transmit(&mut tx, &batch[..len]).await;
        // Only release the bus once the stop bit is out.
        driver_enable.set_low();

        match result {
            Ok(()) => info!("Sent {=[u8]:#x}", &batch[..len]),
            Err(e) => warn!("Failed to send {} response bytes: {}", len, e),
        }
    }
}

async fn transmit(tx: &mut BufferedUartTx<'static>, bytes: &[u8]) -> Result<(), usart::Error> {
    tx.write_all(bytes).await?;
    tx.flush().await
}

fn log_frame_event(event: FrameEvent) {
    match event {
        FrameEvent::LoadComplete(response) => info!("Load finished: {}", response),
        #[cfg(feature = "debug-mode")]
        FrameEvent::LoadStarted { addressed } => debug!("Load started, addressed here: {}", addressed),
        #[cfg(feature = "debug-mode")]
        FrameEvent::Header(header) => debug!("Header event={} param={}", header.event, header.param),
        #[cfg(feature = "debug-mode")]
        FrameEvent::Skipped => debug!("Skipped load for another node"),
        #[cfg(not(feature = "debug-mode"))]
        _ => {}
    }
}
