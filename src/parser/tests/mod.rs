//! Тесты для разбора последовательностей txsim
