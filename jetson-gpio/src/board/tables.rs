//! Built-in pin tables for the Jetson developer kits.

use super::{BoardDefinition, BoardInformation, BoardType, PinDefinition};

fn pin(
    chip_gpio: u32,
    gpio_chip: &str,
    board_pin: u32,
    bcm_pin: u32,
    cvm_name: &str,
    tegra_soc_name: &str,
    pwm: Option<(&str, u32)>,
) -> PinDefinition {
    PinDefinition {
        chip_gpio,
        gpio_chip: gpio_chip.to_string(),
        board_pin,
        bcm_pin,
        cvm_name: cvm_name.to_string(),
        tegra_soc_name: tegra_soc_name.to_string(),
        pwm_chip: pwm.map(|(chip, _)| chip.to_string()),
        pwm_id: pwm.map(|(_, id)| id),
    }
}

fn compatibles(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn xavier_pins() -> Vec<PinDefinition> {
    const MAIN: &str = "2200000.gpio";
    const AON: &str = "c2f0000.gpio";

    vec![
        pin(134, MAIN, 7, 4, "MCLK05", "SOC_GPIO42", None),
        pin(140, MAIN, 11, 17, "UART1_RTS", "UART1_RTS", None),
        pin(63, MAIN, 12, 18, "I2S2_CLK", "DAP2_SCLK", None),
        pin(136, MAIN, 13, 27, "PWM01", "SOC_GPIO44", Some(("32f0000.pwm", 0))),
        pin(105, MAIN, 15, 22, "GPIO27", "SOC_GPIO54", Some(("3280000.pwm", 0))),
        pin(8, AON, 16, 23, "GPIO8", "CAN1_STB", None),
        pin(56, MAIN, 18, 24, "GPIO35", "SOC_GPIO12", Some(("32c0000.pwm", 0))),
        pin(205, MAIN, 19, 10, "SPI1_MOSI", "SPI1_MOSI", None),
        pin(204, MAIN, 21, 9, "SPI1_MISO", "SPI1_MISO", None),
        pin(129, MAIN, 22, 25, "GPIO17", "SOC_GPIO21", None),
        pin(203, MAIN, 23, 11, "SPI1_CLK", "SPI1_CLK", None),
        pin(206, MAIN, 24, 8, "SPI_CS0_N", "SPI_CS0_N", None),
        pin(207, MAIN, 26, 7, "SPI_CS1_N", "SPI_CS1_N", None),
        pin(3, AON, 29, 5, "CAN0_DIN", "CAN0_DIN", None),
        pin(2, AON, 31, 6, "CAN0_DOUT", "CAN0_DOUT", None),
        pin(9, AON, 32, 12, "GPIO9", "CAN1_EN", None),
        pin(0, AON, 33, 13, "CAN1_DOUT", "CAN1_DOUT", None),
        pin(66, MAIN, 35, 19, "I2S2_FS", "DAP2_FS", None),
        pin(141, MAIN, 36, 16, "UART1_CTS", "UART1_CTS", None),
        pin(1, AON, 37, 26, "CAN1_DIN", "CAN1_DIN", None),
        pin(65, MAIN, 38, 20, "I2S2_DIN", "DAP2_DIN", None),
        pin(64, MAIN, 40, 21, "I2S2_DOUT", "DAP2_DOUT", None),
    ]
}

fn nano_pins() -> Vec<PinDefinition> {
    const CHIP: &str = "6000d000.gpio";
    const PWM: &str = "7000a000.pwm";

    vec![
        pin(216, CHIP, 7, 4, "GPIO9", "AUD_MCLK", None),
        pin(50, CHIP, 11, 17, "UART1_RTS", "UART2_RTS", None),
        pin(79, CHIP, 12, 18, "I2S0_SCLK", "DAP4_SCLK", None),
        pin(14, CHIP, 13, 27, "SPI1_SCK", "SPI2_SCK", None),
        pin(194, CHIP, 15, 22, "GPIO12", "LCD_TE", None),
        pin(232, CHIP, 16, 23, "SPI1_CS1", "SPI2_CS1", None),
        pin(15, CHIP, 18, 24, "SPI1_CS0", "SPI2_CS0", None),
        pin(16, CHIP, 19, 10, "SPI0_MOSI", "SPI1_MOSI", None),
        pin(17, CHIP, 21, 9, "SPI0_MISO", "SPI1_MISO", None),
        pin(13, CHIP, 22, 25, "SPI1_MISO", "SPI2_MISO", None),
        pin(18, CHIP, 23, 11, "SPI0_SCK", "SPI1_SCK", None),
        pin(19, CHIP, 24, 8, "SPI0_CS0", "SPI1_CS0", None),
        pin(20, CHIP, 26, 7, "SPI0_CS1", "SPI1_CS1", None),
        pin(149, CHIP, 29, 5, "GPIO01", "CAM_AF_EN", None),
        pin(200, CHIP, 31, 6, "GPIO11", "GPIO_PZ0", None),
        pin(168, CHIP, 32, 12, "GPIO07", "LCD_BL_PW", Some((PWM, 0))),
        pin(38, CHIP, 33, 13, "GPIO13", "GPIO_PE6", Some((PWM, 2))),
        pin(76, CHIP, 35, 19, "I2S0_FS", "DAP4_FS", None),
        pin(51, CHIP, 36, 16, "UART1_CTS", "UART2_CTS", None),
        pin(12, CHIP, 37, 26, "SPI1_MOSI", "SPI2_MOSI", None),
        pin(77, CHIP, 38, 20, "I2S0_DIN", "DAP4_DIN", None),
        pin(78, CHIP, 40, 21, "I2S0_DOUT", "DAP4_DOUT", None),
    ]
}

/// Built-in boards in detection order.
pub(super) fn builtin_boards() -> Vec<BoardDefinition> {
    let xavier_compatibles = compatibles(&[
        "nvidia,p2972-0000",
        "nvidia,p2972-0006",
        "nvidia,jetson-xavier",
    ]);

    vec![
        BoardDefinition {
            board_type: BoardType::JetsonXavier,
            info: BoardInformation {
                p1_revision: 1,
                ram_size: 16384,
                revision: -1,
                name: "Jetson Xavier".into(),
                manufacturer: "NVIDIA".into(),
                processor: "ARM Carmel".into(),
                carrier_board: 2822,
            },
            compatibles: xavier_compatibles.clone(),
            pins: xavier_pins(),
        },
        BoardDefinition {
            board_type: BoardType::JetsonAgxXavier,
            info: BoardInformation {
                p1_revision: 1,
                ram_size: 32768,
                revision: -1,
                name: "Jetson AGX Xavier".into(),
                manufacturer: "NVIDIA".into(),
                processor: "ARM Carmel".into(),
                carrier_board: 2822,
            },
            compatibles: xavier_compatibles,
            pins: xavier_pins(),
        },
        BoardDefinition {
            board_type: BoardType::JetsonNano,
            info: BoardInformation {
                p1_revision: 1,
                ram_size: 2048,
                revision: -1,
                name: "Jetson Nano".into(),
                manufacturer: "NVIDIA".into(),
                processor: "ARM A57".into(),
                carrier_board: 3448,
            },
            compatibles: compatibles(&[
                "nvidia,p3450-0000",
                "nvidia,p3450-0002",
                "nvidia,jetson-nano",
            ]),
            pins: nano_pins(),
        },
    ]
}
