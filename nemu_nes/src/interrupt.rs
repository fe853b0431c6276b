use serde::{Deserialize, Serialize};

/// CPU pause classes raised by DMA traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DmaKind {
    Oam,
    Dmc,
    /// DMC traffic overlapping an OAM transfer; the count tallies the
    /// stalled bus pairs (256 per absorbed transfer, one per fetch),
    /// each worth two cycles
    DmcDuringOam,
}

/// The interrupt exchange between producers (PPU, APU, cart) and the
/// consumer (the step loop). NMI and IRQ are plain levels: producers
/// set, the consumer clears on service. DMA pauses travel on a single
/// request lane with a kind and a count.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Interrupts {
    pub nmi: bool,
    pub irq: bool,
    pub dma: Option<(DmaKind, u16)>,
}

impl Interrupts {
    pub fn raise_dma(&mut self, kind: DmaKind, count: u16) {
        self.dma = match (self.dma.take(), kind) {
            (None, _) => Some((kind, count)),
            // a second request of the same kind extends the first
            (Some((prev, c)), _) if prev == kind => Some((prev, c + count)),
            // a DMC fetch colliding with a queued OAM transfer (in
            // either order) becomes one during-OAM stall covering both
            (Some((_, c)), _) => Some((DmaKind::DmcDuringOam, c + count)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_kind_extends() {
        let mut intr = Interrupts::default();
        intr.raise_dma(DmaKind::Dmc, 1);
        intr.raise_dma(DmaKind::Dmc, 1);
        assert_eq!(intr.dma, Some((DmaKind::Dmc, 2)));
    }

    #[test]
    fn test_dmc_into_oam_merges_to_during_oam() {
        let mut intr = Interrupts::default();
        intr.raise_dma(DmaKind::Oam, 256);
        intr.raise_dma(DmaKind::Dmc, 1);
        assert_eq!(intr.dma, Some((DmaKind::DmcDuringOam, 257)));
    }

    #[test]
    fn test_oam_into_dmc_merges_to_during_oam() {
        let mut intr = Interrupts::default();
        intr.raise_dma(DmaKind::Dmc, 1);
        intr.raise_dma(DmaKind::Oam, 256);
        assert_eq!(intr.dma, Some((DmaKind::DmcDuringOam, 257)));
    }

    #[test]
    fn test_during_oam_keeps_absorbing() {
        let mut intr = Interrupts::default();
        intr.raise_dma(DmaKind::Oam, 256);
        intr.raise_dma(DmaKind::Dmc, 1);
        intr.raise_dma(DmaKind::Dmc, 1);
        assert_eq!(intr.dma, Some((DmaKind::DmcDuringOam, 258)));
    }
}
