#[cfg(all(not(test), not(feature = "debug-checks")))]
pub const ASPEN_ASSERT_LEVEL_DEFINITION: u8 = ASPEN_ASSERT_SIMPLE;

#[cfg(any(test, feature = "debug-checks"))]
pub const ASPEN_ASSERT_LEVEL_DEFINITION: u8 = ASPEN_ASSERT_ADVANCED;

pub const ASPEN_ASSERT_SIMPLE: u8 = 1;
pub const ASPEN_ASSERT_MODERATE: u8 = 2;
pub const ASPEN_ASSERT_ADVANCED: u8 = 3;
pub const ASPEN_ASSERT_EXTREME: u8 = 4;

#[macro_export]
macro_rules! print_aspen_assert_warning_message {
    () => {
        if $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION >= $crate::asserts::ASPEN_ASSERT_MODERATE {
            log::warn!(
                "Potential performance degradation: the Aspen assert level is set to {}, meaning many debug asserts are active which may result in performance degradation.",
                $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION
            );
        };
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! aspen_assert_simple {
    ($($arg:tt)*) => {
        if $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION >= $crate::asserts::ASPEN_ASSERT_SIMPLE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! aspen_assert_eq_simple {
    ($($arg:tt)*) => {
        if $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION >= $crate::asserts::ASPEN_ASSERT_SIMPLE {
            assert_eq!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! aspen_assert_moderate {
    ($($arg:tt)*) => {
        if $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION >= $crate::asserts::ASPEN_ASSERT_MODERATE {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! aspen_assert_advanced {
    ($($arg:tt)*) => {
        if $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION >= $crate::asserts::ASPEN_ASSERT_ADVANCED {
            assert!($($arg)*);
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! aspen_assert_extreme {
    ($($arg:tt)*) => {
        if $crate::asserts::ASPEN_ASSERT_LEVEL_DEFINITION >= $crate::asserts::ASPEN_ASSERT_EXTREME {
            assert!($($arg)*);
        }
    };
}
