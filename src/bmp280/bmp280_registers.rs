use crate::register::{Codec, FieldDescriptor, RegisterDescriptor, Symbol};

use super::bmp280_enums::Bmp280DeviceAddress;

pub const BMP280_ADDRESSES: &[u16] = &[Bmp280DeviceAddress::ADDR_PRIMARY, Bmp280DeviceAddress::ADDR_SECONDARY];

pub const BMP280_SOFT_RESET_COMMAND: u64 = 0xb6;

const OVERSAMPLING: &[(Symbol, u64)] = &[
    (Symbol::Number(1.0), 0b001),
    (Symbol::Number(2.0), 0b010),
    (Symbol::Number(4.0), 0b011),
    (Symbol::Number(8.0), 0b100),
    (Symbol::Number(16.0), 0b101),
];

const POWER_MODE: &[(Symbol, u64)] = &[
    (Symbol::Name("sleep"), 0b00),
    (Symbol::Name("forced"), 0b10),
    (Symbol::Name("normal"), 0b11),
];

const STANDBY_MS: &[(Symbol, u64)] = &[
    (Symbol::Number(0.5), 0b000),
    (Symbol::Number(62.5), 0b001),
    (Symbol::Number(125.0), 0b010),
    (Symbol::Number(250.0), 0b011),
    (Symbol::Number(500.0), 0b100),
    (Symbol::Number(1000.0), 0b101),
    (Symbol::Number(2000.0), 0b110),
    (Symbol::Number(4000.0), 0b111),
];

// -- calibration words, dig_t1 is the first (most significant) word of the block
const fn calibration_word(name: &'static str, index: u32, codec: Codec) -> FieldDescriptor {
    FieldDescriptor::bits(name, 16 * (11 - index), 16, codec)
}

pub const BMP280_REGISTERS: &[RegisterDescriptor] = &[
    RegisterDescriptor {
        name: "CHIP_ID",
        address: 0xd0,
        bit_width: 8,
        fields: &[FieldDescriptor::masked("id", 0xff, Codec::RawUnsigned)],
    },
    RegisterDescriptor {
        name: "RESET",
        address: 0xe0,
        bit_width: 8,
        fields: &[FieldDescriptor::masked("reset", 0xff, Codec::RawUnsigned)],
    },
    RegisterDescriptor {
        name: "STATUS",
        address: 0xf3,
        bit_width: 8,
        fields: &[
            FieldDescriptor::masked("measuring", 0b0000_1000, Codec::RawUnsigned),
            FieldDescriptor::masked("im_update", 0b0000_0001, Codec::RawUnsigned),
        ],
    },
    RegisterDescriptor {
        name: "CTRL_MEAS",
        address: 0xf4,
        bit_width: 8,
        fields: &[
            FieldDescriptor::masked("osrs_t", 0b1110_0000, Codec::Lookup(OVERSAMPLING)),
            FieldDescriptor::masked("osrs_p", 0b0001_1100, Codec::Lookup(OVERSAMPLING)),
            FieldDescriptor::masked("mode", 0b0000_0011, Codec::Lookup(POWER_MODE)),
        ],
    },
    RegisterDescriptor {
        name: "CONFIG",
        address: 0xf5,
        bit_width: 8,
        fields: &[
            FieldDescriptor::masked("t_sb", 0b1110_0000, Codec::Lookup(STANDBY_MS)),
            FieldDescriptor::masked("filter", 0b0001_1100, Codec::RawUnsigned),
            FieldDescriptor::masked("spi3w_en", 0b0000_0001, Codec::RawUnsigned).read_only(),
        ],
    },
    RegisterDescriptor {
        name: "DATA",
        address: 0xf7,
        bit_width: 48,
        fields: &[
            FieldDescriptor::masked("pressure", 0xffff_f000_0000, Codec::RawUnsigned),
            FieldDescriptor::masked("temperature", 0x0000_00ff_fff0, Codec::RawUnsigned),
        ],
    },
    RegisterDescriptor {
        name: "CALIBRATION",
        address: 0x88,
        bit_width: 192,
        fields: &[
            calibration_word("dig_t1", 0, Codec::UnsignedLe16),
            calibration_word("dig_t2", 1, Codec::SignedLe16),
            calibration_word("dig_t3", 2, Codec::SignedLe16),
            calibration_word("dig_p1", 3, Codec::UnsignedLe16),
            calibration_word("dig_p2", 4, Codec::SignedLe16),
            calibration_word("dig_p3", 5, Codec::SignedLe16),
            calibration_word("dig_p4", 6, Codec::SignedLe16),
            calibration_word("dig_p5", 7, Codec::SignedLe16),
            calibration_word("dig_p6", 8, Codec::SignedLe16),
            calibration_word("dig_p7", 9, Codec::SignedLe16),
            calibration_word("dig_p8", 10, Codec::SignedLe16),
            calibration_word("dig_p9", 11, Codec::SignedLe16),
        ],
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::FieldValue;

    fn mask(field: &FieldDescriptor) -> u128 {
        ((1u128 << field.width) - 1) << field.shift
    }

    #[test]
    fn fields_fit_and_do_not_overlap() {
        for register in BMP280_REGISTERS {
            let mut used = [0u128; 2];
            for field in register.fields {
                assert!(field.shift + field.width <= register.bit_width, "{}.{}", register.name, field.name);
                // -- split 192 bit registers into two 128 bit halves for the check
                let (word, shifted) = if field.shift >= 128 {
                    (1, FieldDescriptor { shift: field.shift - 128, ..*field })
                } else {
                    (0, *field)
                };
                let bits = mask(&shifted);
                assert_eq!(used[word] & bits, 0, "{}.{} overlaps", register.name, field.name);
                used[word] |= bits;
            }
        }
    }

    #[test]
    fn register_names_unique() {
        for (i, register) in BMP280_REGISTERS.iter().enumerate() {
            assert!(BMP280_REGISTERS[i + 1..].iter().all(|r| r.name != register.name));
        }
    }

    #[test]
    fn lookup_tables_round_trip() {
        for register in BMP280_REGISTERS {
            for field in register.fields {
                if let Codec::Lookup(table) = field.codec {
                    for (symbol, code) in table {
                        assert_eq!(field.encode((*symbol).into()).unwrap(), *code);
                        assert_eq!(field.decode(*code).unwrap(), FieldValue::Symbol(*symbol));
                    }
                }
            }
        }
    }
}
